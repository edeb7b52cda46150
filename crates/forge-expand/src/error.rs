use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("ambiguous stream expansion for {name}: {candidates} candidate combinations remain")]
    StreamAmbiguous { name: String, candidates: usize },
    #[error("no candidate build satisfies dependency {name}:{stream}")]
    NoCandidates { name: String, stream: String },
    #[error("component {package} declared by more than one nested module")]
    ComponentConflict { package: String },
    #[error("prefixed version overflowed 64 bits")]
    VersionOverflow,
    #[error(transparent)]
    Resolver(#[from] forge_external::ResolverError),
}
