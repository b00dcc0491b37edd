use thiserror::Error;

/// Why a raw provider record could not become a `CanonicalFixture`.
///
/// Only identity problems land here. Bad goal values are normalized to
/// "absent" instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedFixture {
    #[error("fixture record is not a json object")]
    NotAnObject,

    #[error("missing or non-numeric `{0}`")]
    MissingIdentity(&'static str),

    #[error("unparseable kickoff `{0}`")]
    BadKickoff(String),
}

/// A record dropped from a normalized batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFixture {
    pub index: usize,
    pub fixture_id: Option<u64>,
    pub reason: MalformedFixture,
}
