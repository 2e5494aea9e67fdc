use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that end a run. Everything else is handled inside its stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open output file '{}'", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read address file '{}'", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot prepare scratch directory '{}'", .path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{stage} stage terminated abnormally")]
    StageAborted { stage: &'static str },
}
