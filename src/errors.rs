use std::{io, result};

use thiserror::Error;

use crate::{
    builder::BuildError, convert::ConvertError, frontend::FrontEndError, grammar::GrammarError,
    transition::DecodeError, tree::TreeError, verify::RenderError,
};

pub type Result<T> = result::Result<T, Error>;

/// Enum representing any error of a translation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error("convert error: {0}")]
    Convert(#[from] ConvertError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("front-end error: {0}")]
    FrontEnd(#[from] FrontEndError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
