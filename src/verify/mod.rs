//! Round-trip verification.
//!
//! A [`Verifier`] drives one translation unit through the whole pipeline:
//!
//! ```txt
//! JSON -> CppAst -> AsdlAst -> [actions -> AsdlAst'] -> CppAst' -> text'
//! ```
//!
//! The trees are compared structurally at every stage. With a [`Renderer`]
//! the rendered texts of both trees are compared too, and so are the
//! rendered tree and the original source after [normalization](Normalizer).
//! A mismatch is a [`Verdict`], not an error, so a batch can go on with the
//! next file.

mod batch;
mod normalize;

use std::fmt;

use thiserror::Error;

use crate::{
    convert,
    errors::Result,
    frontend::ParsedSource,
    grammar::Grammar,
    transition,
    tree::CppAst,
};

pub use self::{
    batch::{
        collect_files, has_source_extension, Batch, BatchReport, Exclusions, Failure,
        SOURCE_EXTENSIONS,
    },
    normalize::{divergence, simplify, stdin_section, Divergence, Normalizer},
};

/// The renderer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Turns a native tree back into source text.
pub trait Renderer {
    fn render(&self, tree: &CppAst) -> std::result::Result<String, RenderError>;
}

/// The pipeline stage where a mismatch was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The rendered native tree against the original source.
    Source,
    /// The native tree against the one converted back from the ASDL tree.
    Asdl,
    /// The ASDL tree against the one decoded from its actions.
    Actions,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Source => write!(f, "source"),
            Stage::Asdl => write!(f, "asdl"),
            Stage::Actions => write!(f, "actions"),
        }
    }
}

/// A failed comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub stage: Stage,
    pub divergence: Divergence,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mismatch at offset {} ({}% in common), common prefix ends with `{}`",
            self.stage, self.divergence.offset, self.divergence.percent, self.divergence.context
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Mismatch(Box<Mismatch>),
}

impl Verdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok)
    }
}

/// Verifier configuration.
#[derive(Clone, Copy, Default)]
pub struct VerifyOptions<'r> {
    /// Also replay the action encoding of the ASDL tree.
    pub check_actions: bool,
    pub renderer: Option<&'r dyn Renderer>,
}

impl fmt::Debug for VerifyOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyOptions")
            .field("check_actions", &self.check_actions)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

/// Checks that translation units survive the round trip.
#[derive(Debug)]
pub struct Verifier<'g, 'r> {
    grammar: &'g Grammar,
    options: VerifyOptions<'r>,
    normalizer: Normalizer,
}

impl<'g, 'r> Verifier<'g, 'r> {
    pub fn new(grammar: &'g Grammar, options: VerifyOptions<'r>) -> Result<Self> {
        Ok(Verifier {
            grammar,
            options,
            normalizer: Normalizer::new()?,
        })
    }

    pub fn options(&self) -> &VerifyOptions<'r> {
        &self.options
    }

    /// Verifies one parsed translation unit.
    pub fn verify(&self, parsed: &ParsedSource) -> Result<Verdict> {
        let native = parsed.build()?;
        self.verify_tree(&native, &stdin_section(&parsed.source))
    }

    /// Verifies a native tree built from `original`, the text of the main file.
    pub fn verify_tree(&self, native: &CppAst, original: &str) -> Result<Verdict> {
        let asdl = convert::to_asdl(native, self.grammar)?;
        log::debug!("asdl tree of {} nodes", asdl.size());

        let raised = convert::to_native(&asdl, self.grammar)?;
        if let Some(mismatch) = self.compare(Stage::Asdl, native, &raised)? {
            return Ok(mismatch);
        }

        if self.options.check_actions {
            let actions = transition::encode(&asdl);
            log::debug!("{} actions", actions.len());
            let decoded = transition::decode_as(&actions, self.grammar, asdl.kind().ty.as_str())?;
            let replayed = convert::to_native(&decoded, self.grammar)?;
            if let Some(mismatch) = self.compare(Stage::Actions, native, &replayed)? {
                return Ok(mismatch);
            }
        }

        if let Some(renderer) = self.options.renderer {
            let expected = self.normalizer.normalize(original);
            let found = self.normalizer.normalize(&renderer.render(native)?);
            if let Some(divergence) = divergence(&expected, &found) {
                return Ok(self.mismatch(Stage::Source, divergence, expected, found));
            }
        }
        Ok(Verdict::Ok)
    }

    /// Compares two native trees structurally, then through the renderer
    /// when there is one.
    fn compare(&self, stage: Stage, expected: &CppAst, found: &CppAst) -> Result<Option<Verdict>> {
        if expected != found {
            let (expected, found) = (expected.to_string(), found.to_string());
            // equal renderings of unequal trees still diverge at the end
            let divergence = divergence(&expected, &found).unwrap_or_else(|| Divergence {
                offset: expected.chars().count(),
                percent: 100,
                context: String::new(),
            });
            return Ok(Some(self.mismatch(stage, divergence, expected, found)));
        }
        let Some(renderer) = self.options.renderer else {
            return Ok(None);
        };
        let expected = self.normalizer.normalize(&renderer.render(expected)?);
        let found = self.normalizer.normalize(&renderer.render(found)?);
        Ok(divergence(&expected, &found)
            .map(|divergence| self.mismatch(stage, divergence, expected, found)))
    }

    fn mismatch(
        &self,
        stage: Stage,
        divergence: Divergence,
        expected: String,
        found: String,
    ) -> Verdict {
        let mismatch = Mismatch {
            stage,
            divergence,
            expected,
            found,
        };
        log::warn!("{mismatch}");
        Verdict::Mismatch(Box::new(mismatch))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::tree::NodeKind;

    /// Renders just enough C++ for the trees below.
    struct Tiny;

    impl Renderer for Tiny {
        fn render(&self, tree: &CppAst) -> std::result::Result<String, RenderError> {
            match tree.kind() {
                NodeKind::TranslationUnit => {
                    tree
                        .children("stmts")
                        .map(|stmt| self.render(stmt))
                        .collect()
                }
                NodeKind::DeclStmt => {
                    tree
                        .children("decls")
                        .map(|decl| self.render(decl))
                        .collect()
                }
                NodeKind::CXXRecordDecl => Ok(format!(
                    "{} {} {{}};",
                    tree.token("tag").unwrap_or_default(),
                    tree.token("name").unwrap_or_default()
                )),
                kind => Err(RenderError(format!("cannot render {kind}"))),
            }
        }
    }

    /// Always renders the same text.
    struct Fixed(&'static str);

    impl Renderer for Fixed {
        fn render(&self, _: &CppAst) -> std::result::Result<String, RenderError> {
            Ok(self.0.to_owned())
        }
    }

    fn class_document() -> ParsedSource {
        let document = json!({
            "TypeSummary": [],
            "Content": {"kind": "TranslationUnitDecl", "id": "0x1", "inner": [{
                "id": "0x2", "kind": "CXXRecordDecl",
                "loc": {"offset": 6, "file": "<stdin>", "line": 1, "col": 7},
                "name": "Test", "tagUsed": "class", "completeDefinition": true, "inner": [],
            }]},
        });
        ParsedSource::new("# 1 \"<stdin>\"\nclass Test {};\n".to_owned(), document).unwrap()
    }

    #[test]
    fn test_structural_round_trip() {
        let grammar = Grammar::cpp().unwrap();
        let options = VerifyOptions {
            check_actions: true,
            renderer: None,
        };
        let verifier = Verifier::new(&grammar, options).unwrap();
        assert_eq!(verifier.verify(&class_document()).unwrap(), Verdict::Ok);
    }

    #[test]
    fn test_rendered_round_trip() {
        let grammar = Grammar::cpp().unwrap();
        let options = VerifyOptions {
            check_actions: true,
            renderer: Some(&Tiny),
        };
        let verifier = Verifier::new(&grammar, options).unwrap();
        assert!(verifier.verify(&class_document()).unwrap().is_ok());
    }

    #[test]
    fn test_source_mismatch() {
        let grammar = Grammar::cpp().unwrap();
        let renderer = Fixed("class Tost {};");
        let options = VerifyOptions {
            check_actions: false,
            renderer: Some(&renderer),
        };
        let verifier = Verifier::new(&grammar, options).unwrap();
        let Verdict::Mismatch(mismatch) = verifier.verify(&class_document()).unwrap() else {
            panic!("expected a mismatch");
        };
        assert_eq!(mismatch.stage, Stage::Source);
        assert_eq!(mismatch.divergence.offset, 6);
        assert_eq!(mismatch.expected, "classtest{};");
        assert_eq!(
            mismatch.to_string(),
            "source mismatch at offset 6 (50% in common), common prefix ends with `classt`"
        );
    }

    #[test]
    fn test_trees_are_compared_before_rendering() {
        let grammar = Grammar::cpp().unwrap();
        let renderer = Fixed("x");
        let options = VerifyOptions {
            check_actions: true,
            renderer: Some(&renderer),
        };
        let verifier = Verifier::new(&grammar, options).unwrap();

        let unit = |stmt: CppAst| {
            CppAst::new(NodeKind::TranslationUnit, [("stmts", vec![stmt].into())]).unwrap()
        };
        let expected = unit(CppAst::new(NodeKind::NullStmt, []).unwrap());
        let found = unit(CppAst::new(NodeKind::BreakStmt, []).unwrap());
        let same = verifier
            .compare(Stage::Actions, &expected, &expected)
            .unwrap();
        assert!(same.is_none());
        let Some(Verdict::Mismatch(mismatch)) =
            verifier.compare(Stage::Actions, &expected, &found).unwrap()
        else {
            panic!("expected a mismatch");
        };
        assert_eq!(mismatch.stage, Stage::Actions);
        assert_eq!(mismatch.expected, expected.to_string());
        assert_eq!(mismatch.found, found.to_string());
        assert!(mismatch.found.contains("BreakStmt"));
    }

    #[test]
    fn test_render_error() {
        let grammar = Grammar::cpp().unwrap();
        let null = CppAst::new(NodeKind::NullStmt, []).unwrap();
        let unit = CppAst::new(NodeKind::TranslationUnit, [("stmts", vec![null].into())]).unwrap();
        let options = VerifyOptions {
            check_actions: false,
            renderer: Some(&Tiny),
        };
        let verifier = Verifier::new(&grammar, options).unwrap();
        assert!(matches!(
            verifier.verify_tree(&unit, ""),
            Err(crate::Error::Render(RenderError(_)))
        ));
    }
}
