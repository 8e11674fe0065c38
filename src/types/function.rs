//! Intrinsic function names.

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The closed set of intrinsic functions the resolver understands.
///
/// A single-key mapping whose key is one of these names is a function call;
/// any other mapping is plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display, EnumIter)]
pub enum FunctionKind {
    #[strum(serialize = "Ref")]
    Ref,
    #[strum(serialize = "Fn::Join")]
    Join,
    #[strum(serialize = "Fn::Sub")]
    Sub,
    #[strum(serialize = "Fn::FindInMap")]
    FindInMap,
    #[strum(serialize = "Fn::Select")]
    Select,
    #[strum(serialize = "Fn::Split")]
    Split,
    #[strum(serialize = "Fn::If")]
    If,
    #[strum(serialize = "Fn::And")]
    And,
    #[strum(serialize = "Fn::Or")]
    Or,
    #[strum(serialize = "Fn::Not")]
    Not,
    #[strum(serialize = "Fn::Equals")]
    Equals,
    #[strum(serialize = "Fn::Base64")]
    Base64,
    #[strum(serialize = "Fn::GetAtt")]
    GetAtt,
    #[strum(serialize = "Fn::GetAZs")]
    GetAZs,
    #[strum(serialize = "Fn::ImportValue")]
    ImportValue,
    #[strum(serialize = "Condition")]
    Condition,
}
