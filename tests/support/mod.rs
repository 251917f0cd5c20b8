#![allow(unused)]

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Once};

use hickory_proto::rr::Name;
use hickory_proto::rustls::default_provider;
use rustls::ServerConfig;
use rustls::pki_types::pem::{self, PemObject};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use acorn_dns::{RecordStore, Responder};

/// Registers a global default tracing subscriber when called for the first time. This is intended
/// for use in tests.
pub fn subscribe() {
    static INSTALL_TRACING_SUBSCRIBER: Once = Once::new();
    INSTALL_TRACING_SUBSCRIBER.call_once(|| {
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).unwrap();
    });
}

pub fn name(raw: &str) -> Name {
    Name::from_str(raw).unwrap()
}

pub fn addr(raw: &str) -> IpAddr {
    IpAddr::from_str(raw).unwrap()
}

/// Responder over a store holding the records the end-to-end tests query.
pub fn www_responder() -> Responder {
    let store = RecordStore::new();
    store.add_address(&name("www.example.com"), addr("1.1.1.1"));
    store.add_alias(&name("alias.example.com"), &name("www.example.com"));
    Responder::new(Arc::new(store))
}

pub fn test_data(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/test-data")
        .join(file)
}

pub fn read_certs(cert_path: impl AsRef<Path>) -> Result<Vec<CertificateDer<'static>>, pem::Error> {
    CertificateDer::pem_file_iter(cert_path)?.collect::<Result<Vec<_>, _>>()
}

/// Server-side TLS configuration for the checked-in `dns.example.com` cert.
pub fn server_config() -> ServerConfig {
    let cert_chain = read_certs(test_data("cert.pem")).unwrap();
    let key = PrivateKeyDer::from_pem_file(test_data("cert.key")).unwrap();

    ServerConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .unwrap()
}
