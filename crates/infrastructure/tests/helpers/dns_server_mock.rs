use dot_proxy_infrastructure::dns::framing::read_framed;
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tokio_rustls::TlsAcceptor;

use super::answer_for;

/// Throwaway CA plus a leaf for `localhost` signed by it.
pub struct TestPki {
    pub ca_pem: String,
    pub server_config: Arc<ServerConfig>,
}

impl TestPki {
    pub fn generate() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "dot-proxy test CA");
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let mut leaf_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        leaf_params
            .distinguished_name
            .push(DnType::CommonName, "localhost");
        leaf_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf_key.serialize_der()));
        let server_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![leaf_cert.der().clone()], key)
            .unwrap();

        Self {
            ca_pem: ca_cert.pem(),
            server_config: Arc::new(server_config),
        }
    }

    pub fn ca_bundle(&self) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(self.ca_pem.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ServerBehavior {
    Answer(Ipv4Addr),
    /// Answer written a few bytes at a time.
    Chunked(Ipv4Addr),
    /// Read the query, never answer, wait for the client to hang up.
    Stall,
    /// Read the query and close without answering.
    Close,
}

/// Local DNS-over-TLS resolver.
pub struct MockDotServer {
    addr: SocketAddr,
    pki: TestPki,
    queries: Arc<AtomicUsize>,
    client_closed: Arc<Notify>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDotServer {
    pub async fn start(behavior: ServerBehavior) -> Self {
        let pki = TestPki::generate();
        let acceptor = TlsAcceptor::from(pki.server_config.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let queries = Arc::new(AtomicUsize::new(0));
        let client_closed = Arc::new(Notify::new());
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let queries_task = queries.clone();
        let closed_task = client_closed.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    accepted = listener.accept() => {
                        let Ok((tcp, _)) = accepted else { continue };
                        let acceptor = acceptor.clone();
                        let queries = queries_task.clone();
                        let closed = closed_task.clone();
                        tokio::spawn(async move {
                            let Ok(mut stream) = acceptor.accept(tcp).await else { return };
                            let Ok(query) = read_framed(&mut stream).await else { return };
                            queries.fetch_add(1, Ordering::SeqCst);

                            match behavior {
                                ServerBehavior::Answer(ip) => {
                                    let answer = answer_for(&query, ip);
                                    let mut frame = (answer.len() as u16).to_be_bytes().to_vec();
                                    frame.extend_from_slice(&answer);
                                    let _ = stream.write_all(&frame).await;
                                    let _ = stream.flush().await;
                                }
                                ServerBehavior::Chunked(ip) => {
                                    let answer = answer_for(&query, ip);
                                    let mut frame = (answer.len() as u16).to_be_bytes().to_vec();
                                    frame.extend_from_slice(&answer);
                                    for chunk in frame.chunks(3) {
                                        let _ = stream.write_all(chunk).await;
                                        let _ = stream.flush().await;
                                        tokio::time::sleep(Duration::from_millis(1)).await;
                                    }
                                }
                                ServerBehavior::Stall => {
                                    let mut buf = [0u8; 1];
                                    let _ = stream.read(&mut buf).await;
                                    closed.notify_one();
                                    return;
                                }
                                ServerBehavior::Close => return,
                            }

                            let mut rest = Vec::new();
                            let _ = stream.read_to_end(&mut rest).await;
                        });
                    }
                }
            }
        });

        Self {
            addr,
            pki,
            queries,
            client_closed,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ca_bundle(&self) -> NamedTempFile {
        self.pki.ca_bundle()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub async fn wait_for_queries(&self, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.queries() < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    /// True if a stalled client dropped its connection within `timeout`.
    pub async fn client_closed_within(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.client_closed.notified())
            .await
            .is_ok()
    }
}

impl Drop for MockDotServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
