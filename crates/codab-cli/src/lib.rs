// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod logging;
mod pipeline;

pub use logging::{RunEvent, RunLog, RunStage};
pub use pipeline::{
    BatchResult, CountryOutcome, LogPublisher, NoCatalog, Pipeline, PipelineError,
    PipelineOptions, Publisher,
};

pub const CRATE_NAME: &str = "codab-cli";
