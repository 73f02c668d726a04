#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vm_broker::network;
use vm_broker::proto::Value;
use vm_broker::BackendBinding;
use vm_broker::Broker;
use vm_broker::BrokerClient;
use vm_broker::BuiltinProvider;
use vm_broker::ServerConfig;
use vm_broker::SessionConfig;

pub fn counter_broker() -> Arc<Broker> {
    let backend = BackendBinding::with_provider(Arc::new(BuiltinProvider::with_defaults()));
    Arc::new(Broker::new(backend, SessionConfig::default()))
}

pub fn in_process_client(broker: &Arc<Broker>) -> BrokerClient {
    BrokerClient::builder()
        .request_timeout(Duration::from_secs(5))
        .in_process(broker.clone())
}

pub struct TcpHost {
    pub addr: SocketAddr,
    pub broker: Arc<Broker>,
    shutdown: watch::Sender<()>,
    server: JoinHandle<vm_broker::Result<()>>,
}

impl TcpHost {
    pub async fn start() -> Self {
        let config = ServerConfig {
            listen_address: "127.0.0.1:0".into(),
            ..ServerConfig::default()
        };
        let listener = network::bind(&config).await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let broker = counter_broker();
        let (shutdown, shutdown_rx) = watch::channel(());
        let server = tokio::spawn(network::serve(listener, broker.clone(), config, shutdown_rx));
        Self {
            addr,
            broker,
            shutdown,
            server,
        }
    }

    pub async fn client(&self) -> BrokerClient {
        BrokerClient::builder()
            .connect_timeout(Duration::from_secs(1))
            .request_timeout(Duration::from_secs(5))
            .connect(self.addr)
            .await
            .expect("connect")
    }

    pub async fn stop(self) {
        self.shutdown.send(()).expect("server alive");
        self.server.await.expect("server task").expect("server result");
    }
}

/// Collects every value a listener sees.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Value>>>);

impl Recorder {
    pub fn callback(&self) -> impl Fn(&Value) + Send + Sync + 'static {
        let inner = self.0.clone();
        move |v: &Value| inner.lock().push(v.clone())
    }

    pub fn values(&self) -> Vec<Value> {
        self.0.lock().clone()
    }
}

/// Polls `cond` until it holds or a second has passed.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
