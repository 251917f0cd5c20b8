//! Query resolution against a [`RecordStore`].

use std::sync::Arc;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::CNAME;
use hickory_proto::rr::{DNSClass, RData, RecordType};
use tracing::debug;

use crate::store::RecordStore;

/// Upper bound on alias hops before a query is failed.
///
/// This guards against alias cycles and pathologically long chains; it is a
/// fail-safe bound, not a cycle detector.
const MAX_ALIAS_CHAIN: usize = 10;

/// Resolves single-question queries against a shared [`RecordStore`].
///
/// The responder holds no state of its own, so one instance can serve any
/// number of concurrent transports.
#[derive(Debug, Clone)]
pub struct Responder {
    store: Arc<RecordStore>,
}

impl Responder {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// The store this responder answers from.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Produce the complete response for `query`.
    ///
    /// Malformed queries (already a response, not exactly one question, or a
    /// non-Internet class) are answered with `REFUSED`. Otherwise the
    /// question is resolved by chasing CNAME records up to
    /// [`MAX_ALIAS_CHAIN`] hops; traversed aliases appear in the answer
    /// section ahead of the terminal records.
    pub fn respond(&self, query: &Message) -> Message {
        if query.message_type() == MessageType::Response || query.queries().len() != 1 {
            return reply(query, ResponseCode::Refused);
        }

        let question = &query.queries()[0];
        if question.query_class() != DNSClass::IN {
            return reply(query, ResponseCode::Refused);
        }

        let qtype = question.query_type();
        let mut current = question.name().clone();
        let mut aliases = Vec::new();

        for _ in 0..MAX_ALIAS_CHAIN {
            match self.store.lookup(&current, qtype) {
                // records of the requested type: answer with the alias
                // chain first, then the terminal records
                Some(records) if !records.is_empty() => {
                    let mut response = reply(query, ResponseCode::NoError);
                    response.add_answers(aliases);
                    response.add_answers(records);
                    return response;
                }

                // the name exists without the requested type: follow an
                // alias if one is present
                Some(_) => match self.store.lookup(&current, RecordType::CNAME) {
                    Some(cnames) if !cnames.is_empty() => {
                        let next = match cnames[0].data() {
                            RData::CNAME(CNAME(target)) => target.clone(),
                            // lookup filtered by CNAME only yields CNAME rdata
                            _ => return reply(query, ResponseCode::ServFail),
                        };
                        aliases.extend(cnames);
                        current = next;
                    }
                    _ => return reply(query, ResponseCode::NoError),
                },

                None => return reply(query, ResponseCode::NXDomain),
            }
        }

        debug!(name = %question.name(), "alias chain exceeded {MAX_ALIAS_CHAIN} hops");
        reply(query, ResponseCode::ServFail)
    }
}

/// Response skeleton echoing the query's identity and question section.
fn reply(query: &Message, code: ResponseCode) -> Message {
    let mut response = Message::new();
    response
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(query.op_code())
        .set_recursion_desired(query.recursion_desired())
        .set_response_code(code)
        .add_queries(query.queries().to_vec());
    response
}
