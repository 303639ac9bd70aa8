//! Demo service
//!
//! The `user-service` used by the bundled binaries and the end-to-end tests.
//! Its reply is configurable at runtime so callers can observe success,
//! failure and partial results.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::server::{CallContext, Outcome};

/// Lookup by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetByIdReq {
    pub id: i64,
}

/// Lookup result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetByIdResp {
    pub msg: String,
}

crate::rpc_service! {
    /// User lookups
    pub service UserService("user-service") {
        client: UserServiceClient;
        server: UserServiceServer;

        /// Fetch the user with the given id
        GetById => fn get_by_id(GetByIdReq) -> GetByIdResp;
    }
}

#[derive(Debug, Clone, Default)]
struct Canned {
    msg: String,
    err: Option<String>,
}

/// `UserService` handler returning a configurable reply
#[derive(Debug, Default)]
pub struct UserServiceImpl {
    reply: Mutex<Canned>,
    calls: AtomicUsize,
    last_id: Mutex<Option<i64>>,
}

impl UserServiceImpl {
    /// Handler that answers every lookup with `msg`
    pub fn new(msg: impl Into<String>) -> Self {
        let handler = Self::default();
        handler.set_reply(msg, None);
        handler
    }

    /// Change what the next lookups return
    pub fn set_reply(&self, msg: impl Into<String>, err: Option<String>) {
        *self.reply.lock() = Canned {
            msg: msg.into(),
            err,
        };
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Id of the most recent lookup
    pub fn last_id(&self) -> Option<i64> {
        *self.last_id.lock()
    }
}

impl UserService for UserServiceImpl {
    fn get_by_id(&self, ctx: &CallContext, req: GetByIdReq) -> Outcome<GetByIdResp> {
        tracing::debug!(
            "GetById({}) from {:?}, one_way={}",
            req.id,
            ctx.peer_addr(),
            ctx.is_one_way()
        );

        *self.last_id.lock() = Some(req.id);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self.reply.lock().clone();
        Outcome {
            value: Some(GetByIdResp { msg: reply.msg }),
            error: reply.err,
        }
    }
}
