//! Client Tests
//!
//! Tests for the client dispatch engine against an in-memory proxy.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tinyrpc::client::{Proxy, Reply};
use tinyrpc::demo::{GetByIdReq, GetByIdResp, UserServiceClient};
use tinyrpc::error::{ONE_WAY_ACK, ROUTING_PREFIX};
use tinyrpc::protocol::{Request, Response, ONE_WAY_KEY};
use tinyrpc::server::{CallContext, Outcome};
use tinyrpc::{CallOptions, Client, Codec, Result, RpcError, Serializer, Server};

// =============================================================================
// Helper Functions
// =============================================================================

type Responder = Box<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// Proxy that records requests and answers with a canned function
struct MockProxy {
    seen: Mutex<Vec<Request>>,
    responder: Responder,
}

impl MockProxy {
    fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    fn last(&self) -> Request {
        self.seen.lock().last().cloned().unwrap()
    }

    fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl Proxy for MockProxy {
    fn invoke(&self, opts: &CallOptions, request: Request) -> Result<Response> {
        self.seen.lock().push(request.clone());
        if opts.one_way {
            return Err(RpcError::OneWay);
        }
        (self.responder)(&request)
    }
}

/// Response carrying `msg` encoded with `codec`, plus optional error text
fn reply_with(codec: Codec, req: &Request, msg: Option<&str>, error: Option<&str>) -> Response {
    let mut resp = Response::for_request(req);
    if let Some(msg) = msg {
        let data = codec
            .encode(&GetByIdResp {
                msg: msg.to_string(),
            })
            .unwrap();
        resp.set_data(data);
    }
    if let Some(error) = error {
        resp.set_error(error);
    }
    resp
}

fn user_client(proxy: Arc<MockProxy>, codec: Codec) -> UserServiceClient<Arc<MockProxy>, Codec> {
    Client::with_proxy(proxy, codec).init_service().unwrap()
}

// =============================================================================
// Request Building Tests
// =============================================================================

#[test]
fn test_request_fields() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::JSON, req, Some("hi"), None)));
    let users = user_client(Arc::clone(&proxy), Codec::JSON);

    let opts = CallOptions::new().with_meta("trace-id", "123");
    users.get_by_id(&opts, &GetByIdReq { id: 123 });

    let req = proxy.last();
    assert_eq!(req.service_name, "user-service");
    assert_eq!(req.method_name, "GetById");
    assert_eq!(req.serializer, 1);
    assert_eq!(req.version, 1);
    assert_eq!(req.compression, 0);
    assert_eq!(req.data, &b"{\"id\":123}"[..]);
    assert_eq!(req.meta.get("trace-id").map(String::as_str), Some("123"));
    assert!(!req.meta.contains_key(ONE_WAY_KEY));
    assert_eq!(req.head_length as usize, req.computed_head_length());
    assert_eq!(req.body_length as usize, req.data.len());
}

#[test]
fn test_message_ids_increase() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::JSON, req, Some("hi"), None)));
    let client = Client::with_proxy(Arc::clone(&proxy), Codec::JSON);
    let users: UserServiceClient<_, _> = client.init_service().unwrap();
    let again: UserServiceClient<_, _> = client.clone().init_service().unwrap();

    users.get_by_id(&CallOptions::new(), &GetByIdReq { id: 1 });
    let first = proxy.last().message_id;
    again.get_by_id(&CallOptions::new(), &GetByIdReq { id: 2 });
    let second = proxy.last().message_id;

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

#[test]
fn test_bincode_client_sets_code() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::BINCODE, req, Some("bin"), None)));
    let users = user_client(Arc::clone(&proxy), Codec::BINCODE);

    let reply = users.get_by_id(&CallOptions::new(), &GetByIdReq { id: 9 });

    assert!(reply.is_ok());
    assert_eq!(reply.value.msg, "bin");
    assert_eq!(proxy.last().serializer, 2);
}

// =============================================================================
// Reply Mapping Tests
// =============================================================================

#[test]
fn test_success() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::JSON, req, Some("hello, world"), None)));
    let users = user_client(proxy, Codec::JSON);

    let reply = users.get_by_id(&CallOptions::new(), &GetByIdReq { id: 123 });

    assert!(reply.error.is_none());
    assert_eq!(reply.value.msg, "hello, world");
}

#[test]
fn test_handler_error_with_empty_value() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::JSON, req, None, Some("not found"))));
    let users = user_client(proxy, Codec::JSON);

    let reply = users.get_by_id(&CallOptions::new(), &GetByIdReq { id: 123 });

    match &reply.error {
        Some(RpcError::Handler(text)) => assert_eq!(text, "not found"),
        other => panic!("Expected handler error, got {:?}", other),
    }
    assert_eq!(reply.error.as_ref().map(|e| e.to_string()).as_deref(), Some("not found"));
    assert_eq!(reply.value, GetByIdResp::default());
}

#[test]
fn test_partial_value_with_error() {
    let proxy = MockProxy::new(|req| {
        Ok(reply_with(Codec::JSON, req, Some("partial"), Some("degraded")))
    });
    let users = user_client(proxy, Codec::JSON);

    let (value, error) = users
        .get_by_id(&CallOptions::new(), &GetByIdReq { id: 1 })
        .into_parts();

    assert_eq!(value.msg, "partial");
    assert_eq!(error.map(|e| e.to_string()).as_deref(), Some("degraded"));
}

#[test]
fn test_routing_prefix_maps_to_routing_error() {
    let proxy = MockProxy::new(|req| {
        let text = format!("{}service not found: ghost-service", ROUTING_PREFIX);
        Ok(reply_with(Codec::JSON, req, None, Some(text.as_str())))
    });
    let client = Client::with_proxy(proxy, Codec::JSON);

    let reply: Reply<GetByIdResp> =
        client.call("ghost-service", "GetById", &CallOptions::new(), &GetByIdReq { id: 1 });

    match reply.error {
        Some(RpcError::Routing(text)) => assert_eq!(text, "service not found: ghost-service"),
        other => panic!("Expected routing error, got {:?}", other),
    }
}

#[test]
fn test_transport_error_gives_default_value() {
    let proxy = MockProxy::new(|_| Err(RpcError::Transport("connection reset".to_string())));
    let users = user_client(proxy, Codec::JSON);

    let reply = users.get_by_id(&CallOptions::new(), &GetByIdReq { id: 1 });

    assert!(matches!(reply.error, Some(RpcError::Transport(_))));
    assert_eq!(reply.value, GetByIdResp::default());
}

#[test]
fn test_undecodable_reply_is_decode_error() {
    let proxy = MockProxy::new(|req| {
        let mut resp = Response::for_request(req);
        resp.set_data(Bytes::from_static(b"{not json"));
        Ok(resp)
    });
    let users = user_client(proxy, Codec::JSON);

    let reply = users.get_by_id(&CallOptions::new(), &GetByIdReq { id: 1 });

    assert!(matches!(reply.error, Some(RpcError::Decode(_))));
    assert_eq!(reply.value, GetByIdResp::default());
}

#[test]
fn test_into_result() {
    let ok: Reply<u32> = Reply::ok(5);
    assert_eq!(ok.into_result().unwrap(), 5);

    let failed: Reply<u32> = Reply::failed(RpcError::OneWay);
    assert!(failed.into_result().unwrap_err().is_one_way());
}

// =============================================================================
// One-Way Tests
// =============================================================================

#[test]
fn test_one_way_sets_meta_and_returns_sentinel() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::JSON, req, None, Some(ONE_WAY_ACK))));
    let users = user_client(Arc::clone(&proxy), Codec::JSON);

    let reply = users.get_by_id(&CallOptions::one_way(), &GetByIdReq { id: 123 });

    assert!(matches!(reply.error, Some(RpcError::OneWay)));
    assert_eq!(reply.value, GetByIdResp::default());

    let req = proxy.last();
    assert!(req.is_one_way());
    assert_eq!(req.meta.get(ONE_WAY_KEY).map(String::as_str), Some("true"));
}

#[test]
fn test_caller_meta_cannot_fake_one_way() {
    let proxy = MockProxy::new(|req| Ok(reply_with(Codec::JSON, req, Some("hi"), None)));
    let users = user_client(Arc::clone(&proxy), Codec::JSON);

    let opts = CallOptions::new().with_meta(ONE_WAY_KEY, "true");
    let reply = users.get_by_id(&opts, &GetByIdReq { id: 1 });

    assert!(reply.is_ok());
    assert!(!proxy.last().is_one_way());
    assert_eq!(proxy.count(), 1);
}

// =============================================================================
// Binding Tests
// =============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
struct Empty {}

tinyrpc::rpc_service! {
    service Broken("broken\nservice") {
        client: BrokenClient;
        server: BrokenServer;

        Ping => fn ping(Empty) -> Empty;
    }
}

tinyrpc::rpc_service! {
    service Twice("twice-service") {
        client: TwiceClient;
        server: TwiceServer;

        Ping => fn ping(Empty) -> Empty;
        Ping => fn ping_again(Empty) -> Empty;
    }
}

struct Nothing;

impl Broken for Nothing {
    fn ping(&self, _ctx: &CallContext, _req: Empty) -> Outcome<Empty> {
        Outcome::ok(Empty {})
    }
}

impl Twice for Nothing {
    fn ping(&self, _ctx: &CallContext, _req: Empty) -> Outcome<Empty> {
        Outcome::ok(Empty {})
    }

    fn ping_again(&self, _ctx: &CallContext, _req: Empty) -> Outcome<Empty> {
        Outcome::empty()
    }
}

#[test]
fn test_init_service_rejects_bad_descriptor() {
    let proxy = MockProxy::new(|req| Ok(Response::for_request(req)));
    let client = Client::with_proxy(proxy, Codec::JSON);

    let broken: tinyrpc::Result<BrokenClient<_, _>> = client.init_service();
    assert!(matches!(broken, Err(RpcError::Config(_))));

    let twice: tinyrpc::Result<TwiceClient<_, _>> = client.init_service();
    assert!(matches!(twice, Err(RpcError::Config(_))));
}

#[test]
fn test_server_rejects_bad_descriptor() {
    let mut server = Server::new(Default::default());

    assert!(matches!(
        server.register_service(BrokenServer(Nothing)),
        Err(RpcError::Config(_))
    ));
    assert!(matches!(
        server.register_service(TwiceServer(Nothing)),
        Err(RpcError::Config(_))
    ));
}
