//! Data model types shared by the resolver, the condition compiler and the
//! policy queries.
//!
//! Two trees exist side by side:
//! - [`Node`]: the template as parsed, possibly containing intrinsic
//!   function calls (`{"Ref": "X"}`, `{"Fn::Join": [...]}`).
//! - [`Value`]: the fully resolved form, which never contains a function.

mod function;
mod node;
mod parameter;
mod policy;
mod principal;
mod request_context;
mod value;

pub use function::FunctionKind;
pub use node::{FunctionNode, Node};
pub use parameter::{NOECHO_NO_DEFAULT, NOECHO_WITH_DEFAULT, NOECHO_WITH_VALUE, Parameter};
pub use policy::{Effect, PolicyDocument, Statement};
pub use principal::{Principal, PrincipalToken};
pub use request_context::RequestContext;
pub use value::{NO_VALUE, Value};
