//! routewright — ahead-of-time route handler synthesis.
//!
//! Controllers describe their HTTP surface as data: a verb, a path
//! template, content types and one binding descriptor per parameter.
//! At startup the engine resolves every binding to an extraction
//! strategy, synthesizes a typed request handler per method, layers the
//! configured decorator chains around it and assembles everything into
//! an immutable routing table. Requests then dispatch with no further
//! reflection: extract, invoke, render.

mod body;
mod dispatch;
mod handler;
mod request;
mod responder;

pub mod descriptor;
pub mod extract;
pub mod registry;
pub mod resolve;
pub mod synth;
pub mod table;
pub mod value;
pub mod wrap;

mod error;

pub use body::{OptionReqBody, ReqBody, ResponseBody};
pub use dispatch::Dispatcher;
pub use error::{BoxError, BuildError, ExtractError, RouteError};
pub use handler::RouteHandler;
pub use request::{ContextView, FilePart, FormData, PathParams, RequestContext};
pub use responder::Responder;
pub use synth::{BuildContext, HandlerSynthesizer, build_routing_table};
pub use table::{RoutingTable, RoutingTableBuilder};
