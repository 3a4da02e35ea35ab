#[derive(thiserror::Error, Debug)]
pub enum InjectErrorKind {
    #[error("{owner} declares no dependency slot `{slot}`")]
    UnknownSlot { owner: &'static str, slot: &'static str },
    #[error("dependency slot {owner}.{slot} rejected the provided value")]
    SlotTypeMismatch { owner: &'static str, slot: &'static str },
}
