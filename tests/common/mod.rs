//! Fixtures shared by the integration tests: JSON dumps shaped like the
//! front-end output and a renderer for the constructs they contain.

#![allow(dead_code)]

use std::collections::HashMap;

use cpp_asdl::{
    frontend::{CompileCommand, FrontEnd, FrontEndError, ParsedSource},
    tree::{CppAst, NodeKind},
    verify::{RenderError, Renderer},
};
use serde_json::{json, Value};

/// The line marker clang puts in front of preprocessed stdin.
pub const MARKER: &str = "# 1 \"<stdin>\"\n";

pub fn int_type(id: &str) -> Value {
    json!({"node_id": id, "node_inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]})
}

pub fn document(summary: Vec<Value>, decls: Vec<Value>) -> Value {
    json!({
        "TypeSummary": summary,
        "Content": {"kind": "TranslationUnitDecl", "id": "0x1", "inner": decls},
    })
}

/// `int f() { <stmts> }`, with the given extra summary records.
pub fn function(stmts: Vec<Value>, mut summary: Vec<Value>) -> Value {
    summary.push(json!({"node_id": "0x2", "kind": "FunctionProtoType",
                        "inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]}));
    document(
        summary,
        vec![json!({
            "id": "0x2", "kind": "FunctionDecl", "loc": {"offset": 4, "file": "<stdin>"},
            "name": "f", "type": {"qualType": "int ()"},
            "inner": [{"id": "0x3", "kind": "CompoundStmt", "inner": stmts}],
        })],
    )
}

/// `class Test {};`
pub fn class_test() -> Value {
    document(
        Vec::new(),
        vec![json!({
            "id": "0x2", "kind": "CXXRecordDecl", "loc": {"offset": 20, "file": "<stdin>", "line": 1, "col": 7},
            "name": "Test", "tagUsed": "class", "completeDefinition": true,
            "inner": [{"id": "0x3", "kind": "CXXRecordDecl", "isImplicit": true, "name": "Test", "tagUsed": "class"}],
        })],
    )
}

/// `int f(int x) { return x + 1; }`
pub fn add_one() -> Value {
    document(
        vec![
            json!({"node_id": "0x2", "kind": "FunctionProtoType", "inner": [
                {"kind": "BuiltinType", "type": {"qualType": "int"}},
                {"kind": "BuiltinType", "type": {"qualType": "int"}},
            ]}),
            int_type("0x3"),
            int_type("0x6"),
            int_type("0x7"),
            int_type("0x9"),
        ],
        vec![json!({
            "id": "0x2", "kind": "FunctionDecl", "loc": {"offset": 18, "file": "<stdin>"},
            "name": "f", "type": {"qualType": "int (int)"},
            "inner": [
                {"id": "0x3", "kind": "ParmVarDecl", "name": "x", "type": {"qualType": "int"}},
                {"id": "0x4", "kind": "CompoundStmt", "inner": [
                    {"id": "0x5", "kind": "ReturnStmt", "inner": [
                        {"id": "0x6", "kind": "BinaryOperator", "opcode": "+", "inner": [
                            {"id": "0x7", "kind": "ImplicitCastExpr", "inner": [
                                {"id": "0x8", "kind": "DeclRefExpr", "referencedDecl": {"name": "x"}},
                            ]},
                            {"id": "0x9", "kind": "IntegerLiteral", "value": "1"},
                        ]},
                    ]},
                ]},
            ],
        })],
    )
}

/// `int f() { for (int i = 0; i < 10; i++) {} }`
pub fn for_loop() -> Value {
    let stmt = json!({
        "id": "0x4", "kind": "ForStmt",
        "inner": [
            {"id": "0x5", "kind": "DeclStmt", "inner": [
                {"id": "0x6", "kind": "VarDecl", "name": "i", "init": "c",
                 "inner": [{"id": "0x7", "kind": "IntegerLiteral", "value": "0"}]},
            ]},
            {},
            {"id": "0x8", "kind": "BinaryOperator", "opcode": "<", "inner": [
                {"id": "0x9", "kind": "ImplicitCastExpr", "inner": [
                    {"id": "0xa", "kind": "DeclRefExpr", "referencedDecl": {"name": "i"}},
                ]},
                {"id": "0xb", "kind": "IntegerLiteral", "value": "10"},
            ]},
            {"id": "0xc", "kind": "UnaryOperator", "opcode": "++", "isPostfix": true, "inner": [
                {"id": "0xd", "kind": "DeclRefExpr", "referencedDecl": {"name": "i"}},
            ]},
            {"id": "0xe", "kind": "CompoundStmt"},
        ],
    });
    let summary = ["0x6", "0x7", "0x9", "0xb"].into_iter().map(int_type).collect();
    function(vec![stmt], summary)
}

/// `int f() { goto end; end: ; }`
pub fn forward_goto() -> Value {
    function(
        vec![
            json!({"id": "0x4", "kind": "GotoStmt", "targetLabelDeclId": "0x9"}),
            json!({"id": "0x5", "kind": "LabelStmt", "name": "end", "declId": "0x9",
                   "inner": [{"id": "0x6", "kind": "NullStmt"}]}),
        ],
        Vec::new(),
    )
}

pub fn parsed(code: &str, document: Value) -> ParsedSource {
    ParsedSource::new(format!("{MARKER}{code}\n"), document).unwrap()
}

/// Serves canned dumps keyed by source text.
#[derive(Default)]
pub struct CannedFrontEnd {
    pub dumps: HashMap<String, Value>,
}

impl CannedFrontEnd {
    pub fn with(mut self, code: &str, document: Value) -> Self {
        self.dumps.insert(code.to_owned(), document);
        self
    }
}

impl FrontEnd for CannedFrontEnd {
    fn parse_source(&self, code: &str) -> Result<ParsedSource, FrontEndError> {
        match self.dumps.get(code) {
            Some(document) => ParsedSource::new(format!("{MARKER}{code}\n"), document.clone()),
            None => Err(FrontEndError::FrontEndFailure {
                exit_code: Some(1),
                stderr: format!("no dump for `{code}`"),
            }),
        }
    }

    fn parse_command(&self, command: &CompileCommand) -> Result<ParsedSource, FrontEndError> {
        let file = command.source_file().unwrap_or_default();
        self.parse_source(&std::fs::read_to_string(file)?)
    }
}

/// Renders the constructs of the fixtures above.
pub struct MiniRenderer;

impl MiniRenderer {
    fn all<'a>(
        &self,
        nodes: impl Iterator<Item = &'a CppAst>,
        sep: &str,
    ) -> Result<String, RenderError> {
        let rendered = nodes.map(|node| self.render(node)).collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(sep))
    }

    fn field(&self, node: &CppAst, name: &str) -> Result<String, RenderError> {
        node
            .child(name)
            .map_or_else(|| Ok(String::new()), |child| self.render(child))
    }
}

impl Renderer for MiniRenderer {
    fn render(&self, node: &CppAst) -> Result<String, RenderError> {
        let token = |name: &str| node.token(name).unwrap_or_default();
        Ok(match node.kind() {
            NodeKind::TranslationUnit => self.all(node.children("stmts"), "\n")?,
            NodeKind::DeclStmt => {
                let decls = self.all(node.children("decls"), ", ")?;
                match node.children("decls").next().map(CppAst::kind) {
                    Some(NodeKind::VarDecl) => format!("{decls};"),
                    _ => decls,
                }
            }
            NodeKind::CXXRecordDecl => format!(
                "{} {} {{{}}};",
                token("tag"),
                token("name"),
                self.all(node.children("decls"), " ")?
            ),
            NodeKind::FunctionDecl => format!(
                "{} {}({}) {}",
                self.field(node, "return_type")?,
                token("name"),
                self.all(node.children("parameters"), ", ")?,
                self.field(node, "body")?
            ),
            NodeKind::ParmVarDecl => format!("{} {}", self.field(node, "type")?, token("name")),
            NodeKind::VarDecl => match node.child("init") {
                Some(init) => format!(
                    "{} {} = {}",
                    self.field(node, "type")?,
                    token("name"),
                    self.render(init)?
                ),
                None => format!("{} {}", self.field(node, "type")?, token("name")),
            },
            NodeKind::BuiltinType => token("name").to_owned(),
            NodeKind::CompoundStmt => format!("{{ {} }}", self.all(node.children("stmts"), " ")?),
            NodeKind::ReturnStmt => format!("return {};", self.field(node, "value")?),
            NodeKind::NullStmt => ";".to_owned(),
            NodeKind::LabelStmt => format!("{}: {}", token("name"), self.field(node, "stmt")?),
            NodeKind::GotoStmt => format!("goto {};", token("target")),
            NodeKind::ForStmt => format!(
                "for ({}; {}; {}) {}",
                self.field(node, "init")?,
                self.field(node, "cond")?,
                self.field(node, "inc")?,
                self.field(node, "body")?
            ),
            NodeKind::DeclsOrExpr => match node.child("expr") {
                Some(expr) => self.render(expr)?,
                None => self.all(node.children("decls"), ", ")?,
            },
            NodeKind::DeclOrExpr => {
                format!("{}{}", self.field(node, "decl")?, self.field(node, "expr")?)
            }
            NodeKind::BinaryOperator => format!(
                "{} {} {}",
                self.field(node, "lhs")?,
                token("opcode"),
                self.field(node, "rhs")?
            ),
            NodeKind::UnaryOperator if token("postfix") == "true" => {
                format!("{}{}", self.field(node, "expr")?, token("opcode"))
            }
            NodeKind::UnaryOperator => format!("{}{}", token("opcode"), self.field(node, "expr")?),
            NodeKind::ImplicitCastExpr => self.field(node, "expr")?,
            NodeKind::DeclRefExpr => token("name").to_owned(),
            NodeKind::IntegerLiteral => token("value").to_owned(),
            kind => return Err(RenderError(format!("cannot render {kind}"))),
        })
    }
}
