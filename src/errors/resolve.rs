use crate::any::TypeInfo;

use super::inject::InjectErrorKind;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("no registered type for the name `{name}`")]
    TypeNotFound { name: String },
    #[error("type {} is not registered with the assembly", .0.name)]
    UnknownType(TypeInfo),
    #[error("no implementation available for the abstract type {}", .0.name)]
    UnresolvableAbstract(TypeInfo),
    #[error("{} provides no view as {}", concrete.name, requested.name)]
    UnsupportedCast { concrete: TypeInfo, requested: TypeInfo },
    #[error(transparent)]
    Inject(#[from] InjectErrorKind),
}
