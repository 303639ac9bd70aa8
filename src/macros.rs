//! Macros for declaring services.
//!
//! - [`rpc_service!`]: declare a service once, get a handler trait, a client
//!   stub and a server adapter

/// Declare an RPC service.
///
/// Generates:
/// - a handler trait with one method per remote call (server side)
/// - a client stub with one method per remote call, bound through
///   [`Client::init_service`](crate::client::Client::init_service)
/// - a server adapter that turns any handler into a
///   [`ServiceDefinition`](crate::server::ServiceDefinition)
///
/// The name left of `=>` is the method name on the wire; the `fn` name is
/// the Rust method on the trait and the stub.
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use tinyrpc::rpc_service;
/// use tinyrpc::server::{CallContext, Outcome};
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// pub struct EchoReq { pub text: String }
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// pub struct EchoResp { pub text: String }
///
/// rpc_service! {
///     /// Echoes text back
///     pub service Echo("echo-service") {
///         client: EchoClient;
///         server: EchoServer;
///
///         /// Return the input unchanged
///         Echo => fn echo(EchoReq) -> EchoResp;
///     }
/// }
///
/// struct EchoImpl;
///
/// impl Echo for EchoImpl {
///     fn echo(&self, _ctx: &CallContext, req: EchoReq) -> Outcome<EchoResp> {
///         Outcome::ok(EchoResp { text: req.text })
///     }
/// }
///
/// let mut server = tinyrpc::Server::new(Default::default());
/// server.register_service(EchoServer(EchoImpl)).unwrap();
/// ```
#[macro_export]
macro_rules! rpc_service {
    (
        $(#[$meta:meta])*
        $vis:vis service $trait_name:ident ($service_name:literal) {
            client: $client:ident;
            server: $server:ident;

            $(
                $(#[$method_meta:meta])*
                $method:ident => fn $fn_name:ident ($req:ty) -> $resp:ty;
            )+
        }
    ) => {
        $(#[$meta])*
        $vis trait $trait_name: Send + Sync + 'static {
            $(
                $(#[$method_meta])*
                fn $fn_name(
                    &self,
                    ctx: &$crate::server::CallContext,
                    req: $req,
                ) -> $crate::server::Outcome<$resp>;
            )+
        }

        impl<T: $trait_name + ?Sized> $trait_name for ::std::sync::Arc<T> {
            $(
                fn $fn_name(
                    &self,
                    ctx: &$crate::server::CallContext,
                    req: $req,
                ) -> $crate::server::Outcome<$resp> {
                    (**self).$fn_name(ctx, req)
                }
            )+
        }

        #[doc = concat!("Client stub for `", $service_name, "`")]
        $vis struct $client<P = $crate::client::ConnectionProxy, S = $crate::serialize::Codec> {
            client: $crate::client::Client<P, S>,
        }

        impl<P, S> ::std::clone::Clone for $client<P, S> {
            fn clone(&self) -> Self {
                Self {
                    client: ::std::clone::Clone::clone(&self.client),
                }
            }
        }

        impl<P, S> $crate::service::ServiceDescriptor for $client<P, S> {
            const NAME: &'static str = $service_name;
            const METHODS: &'static [&'static str] = &[$(stringify!($method)),+];
        }

        impl<P, S> $crate::client::RemoteService<P, S> for $client<P, S>
        where
            P: $crate::client::Proxy,
            S: $crate::serialize::Serializer,
        {
            fn bind(client: $crate::client::Client<P, S>) -> Self {
                Self { client }
            }
        }

        impl<P, S> $client<P, S>
        where
            P: $crate::client::Proxy,
            S: $crate::serialize::Serializer,
        {
            $(
                $(#[$method_meta])*
                pub fn $fn_name(
                    &self,
                    opts: &$crate::client::CallOptions,
                    req: &$req,
                ) -> $crate::client::Reply<$resp> {
                    self.client.call($service_name, stringify!($method), opts, req)
                }
            )+
        }

        #[doc = concat!("Server adapter for `", $service_name, "`")]
        $vis struct $server<T>(pub T);

        impl<T, S> $crate::server::IntoService<S> for $server<T>
        where
            T: $trait_name,
            S: $crate::serialize::Serializer,
        {
            fn into_service(self) -> $crate::server::ServiceDefinition<S> {
                let handler = ::std::sync::Arc::new(self.0);
                $crate::server::ServiceDefinition::new($service_name)
                $(
                    .method(stringify!($method), {
                        let handler = ::std::sync::Arc::clone(&handler);
                        move |ctx: &$crate::server::CallContext, req: $req| handler.$fn_name(ctx, req)
                    })
                )+
            }
        }
    };
}
