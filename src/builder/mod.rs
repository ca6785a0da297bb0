//! The JSON-to-native-AST builder.
//!
//! [`build`] walks the `Content` section of a clang JSON dump and turns every
//! node into a [`CppAst`] node, joining facts from the `TypeSummary` section
//! by node id. Each JSON kind has exactly one handler; an unknown kind is a
//! hard failure so that no construct is silently dropped.

mod attr;
mod decl;
mod expr;
mod json;
mod kind;
mod patterns;
mod source;
mod stmt;
mod summary;
mod template;
mod types;

use compact_str::{format_compact, CompactString};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use thiserror::Error;

use crate::{
    tree::{Category, CppAst, FieldValue, NodeKind, TreeError},
    utils::Join,
};

pub use self::{
    json::JsonNode,
    kind::ClangKind,
    source::{SourceLoc, SourceRange, SourceText},
    summary::{AsmInfo, Summary},
};

/// The builder error kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildErrorKind {
    #[error("unsupported node kind `{0}`")]
    UnsupportedNodeKind(CompactString),
    #[error("malformed json: node `{node_id}` has no `{missing_key}`")]
    MalformedJson {
        node_id: CompactString,
        missing_key: CompactString,
    },
    #[error("invalid summary record `{node_id}`: {message}")]
    InvalidRecord {
        node_id: CompactString,
        message: String,
    },
    #[error("unexpected child `{child}` in `{parent}`")]
    UnexpectedChild {
        parent: CompactString,
        child: CompactString,
    },
    #[error("`{kind}` expects {expected} children, found {found}")]
    UnexpectedChildCount {
        kind: CompactString,
        expected: CompactString,
        found: usize,
    },
    #[error("goto to undeclared label `{0}` has no spelled target")]
    UnresolvedLabel(CompactString),
    #[error("invalid builtin pattern: {0}")]
    InvalidPattern(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The builder error: what went wrong and the JSON nodes being visited.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", format_ancestors(.ancestors))]
pub struct BuildError {
    pub kind: BuildErrorKind,
    /// `Kind id` of every node on the visit stack, outermost first.
    pub ancestors: Vec<CompactString>,
}

fn format_ancestors(ancestors: &[CompactString]) -> String {
    if ancestors.is_empty() {
        String::new()
    } else {
        format!(" (while visiting {})", ancestors.iter().join(" > "))
    }
}

impl From<BuildErrorKind> for BuildError {
    fn from(kind: BuildErrorKind) -> Self {
        BuildError {
            kind,
            ancestors: Vec::new(),
        }
    }
}

impl From<TreeError> for BuildError {
    fn from(err: TreeError) -> Self {
        BuildErrorKind::from(err).into()
    }
}

/// Builder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Top-level nodes are kept only when they come from this file.
    pub main_file: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            main_file: "<stdin>".to_owned(),
        }
    }
}

/// Builds the native AST of a clang JSON dump of `source`.
pub fn build(document: &Value, source: &str) -> Result<CppAst, BuildError> {
    build_with(document, source, &BuildOptions::default())
}

/// Builds the native AST with explicit options.
pub fn build_with(
    document: &Value,
    source: &str,
    options: &BuildOptions,
) -> Result<CppAst, BuildError> {
    let mut builder = Builder::new(source, options);
    if let Some(summary) = document.get("TypeSummary") {
        builder.summary.ingest(summary)?;
    }
    let content = document
        .get("Content")
        .ok_or_else(|| BuildErrorKind::MalformedJson {
            node_id: "<document>".into(),
            missing_key: "Content".into(),
        })?;
    builder.translation_unit(content)
}

type Built = Result<Option<CppAst>, BuildError>;

/// Goto/label resolution state of one function body.
#[derive(Debug, Default)]
struct LabelScope<'a> {
    /// Label declaration id to label name.
    labels: FxHashMap<&'a str, CompactString>,
    /// Label declaration id to the gotos still waiting for it.
    pending: FxHashMap<&'a str, Vec<u64>>,
    /// Goto node sequence number to its resolved target.
    resolved: FxHashMap<u64, CompactString>,
}

/// Synthetic names of anonymous records.
#[derive(Debug, Default)]
struct AnonymousTable<'a> {
    by_id: FxHashMap<&'a str, CompactString>,
    by_location: FxHashMap<String, CompactString>,
    names: FxHashSet<CompactString>,
}

impl<'a> AnonymousTable<'a> {
    fn assign(&mut self, id: &'a str, location: String) -> CompactString {
        if let Some(name) = self.by_id.get(id) {
            return name.clone();
        }
        let name = format_compact!("$_{}", self.by_id.len());
        self.by_id.insert(id, name.clone());
        self.by_location.insert(location, name.clone());
        self.names.insert(name.clone());
        name
    }

    fn is_anonymous(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// The state of one translation. Never shared between translations.
pub(crate) struct Builder<'a> {
    source: SourceText<'a>,
    main_file: &'a str,
    summary: Summary<'a>,
    anonymous: AnonymousTable<'a>,
    /// JSON nodes currently being visited, outermost first.
    stack: Vec<&'a Value>,
    labels: Vec<LabelScope<'a>>,
    /// The file clang attributes locations without `file` to.
    last_file: Option<&'a str>,
}

impl<'a> Builder<'a> {
    fn new(source: &'a str, options: &'a BuildOptions) -> Self {
        Builder {
            source: SourceText::new(source),
            main_file: &options.main_file,
            summary: Summary::default(),
            anonymous: AnonymousTable::default(),
            stack: Vec::new(),
            labels: Vec::new(),
            last_file: None,
        }
    }

    fn translation_unit(&mut self, node: &'a Value) -> Result<CppAst, BuildError> {
        if node.kind() != Some(ClangKind::TranslationUnitDecl.name()) {
            return Err(BuildErrorKind::UnexpectedChild {
                parent: "Content".into(),
                child: node.kind().unwrap_or_default().into(),
            }
            .into());
        }
        let mut stmts = Vec::new();
        for child in node.inner() {
            if let Some(built) = self.node(child)? {
                stmts.push(as_statement(built)?);
            }
            if let Some(file) = source::last_file(child) {
                self.last_file = Some(file);
            }
        }
        make(NodeKind::TranslationUnit, [("stmts", stmts.into())])
    }

    /// Returns the reason a node is not built, or `None` to build it.
    fn drop_reason(&self, node: &Value) -> Option<&'static str> {
        let implicit = node.flag("isImplicit");
        let referenced = node.flag("isReferenced");
        if implicit && !referenced {
            return Some("implicit");
        }
        if implicit && node.kind() == Some(ClangKind::TypedefDecl.name()) {
            return Some("implicit typedef");
        }
        if !self.stack.is_empty() {
            return None;
        }

        let Some(loc) = SourceLoc::of(node) else {
            return Some("no location");
        };
        if loc.is_included() || SourceRange::of(node).is_some_and(|range| range.is_included()) {
            return Some("included header");
        }
        match loc.file().or(self.last_file) {
            Some(file) if file != self.main_file => Some("other file"),
            _ => None,
        }
    }

    /// Builds one JSON node, or returns `None` when it is filtered out or has
    /// no native counterpart.
    fn node(&mut self, node: &'a Value) -> Built {
        let Some(name) = node.kind() else {
            return Ok(None);
        };
        if let Some(reason) = self.drop_reason(node) {
            log::debug!("drop {name} {} ({reason})", node.id());
            return Ok(None);
        }
        log::debug!("visit {name} {} at depth {}", node.id(), self.stack.len());

        self.stack.push(node);
        let result = match name.parse::<ClangKind>() {
            Ok(kind) => self.dispatch(kind, node),
            Err(()) => Err(BuildErrorKind::UnsupportedNodeKind(name.into()).into()),
        };
        let result = result.map_err(|mut err| {
            if err.ancestors.is_empty() {
                err.ancestors = self
                    .stack
                    .iter()
                    .map(|node| {
                        format_compact!("{} {}", node.kind().unwrap_or_default(), node.id())
                    })
                    .collect();
            }
            err
        });
        self.stack.pop();
        result
    }

    fn dispatch(&mut self, kind: ClangKind, node: &'a Value) -> Built {
        use ClangKind as K;

        match kind {
            K::TranslationUnitDecl => self.translation_unit(node).map(Some),

            // declarations
            K::FunctionDecl => self.function_decl(node),
            K::CXXMethodDecl => self.method_decl(node),
            K::CXXConstructorDecl => self.constructor_decl(node),
            K::CXXDestructorDecl => self.destructor_decl(node),
            K::CXXConversionDecl => self.conversion_decl(node),
            K::CXXCtorInitializer => self.ctor_initializer(node),
            K::ParmVarDecl => self.parm_var_decl(node),
            K::VarDecl => self.var_decl(node),
            K::FieldDecl => self.field_decl(node),
            K::CXXRecordDecl => self.record_decl(node, NodeKind::CXXRecordDecl),
            K::RecordDecl => self.record_decl(node, NodeKind::RecordDecl),
            K::TypedefDecl => self.named_type_decl(node, NodeKind::TypedefDecl),
            K::TypeAliasDecl => self.named_type_decl(node, NodeKind::TypeAliasDecl),
            K::NamespaceDecl => self.namespace_decl(node),
            K::UsingDirectiveDecl => self.using_directive_decl(node),
            K::UsingDecl => self.named(node, NodeKind::UsingDecl, "name"),
            K::StaticAssertDecl => self.static_assert_decl(node),
            K::EnumDecl => self.enum_decl(node),
            K::EnumConstantDecl => self.enum_constant_decl(node),
            K::AccessSpecDecl => self.access_spec_decl(node),
            K::FriendDecl => self.friend_decl(node),
            // aliases of the fields of anonymous records, never written
            K::IndirectFieldDecl => Ok(None),

            // templates
            K::ClassTemplateDecl => self.class_template_decl(node),
            K::ClassTemplateSpecializationDecl => {
                self.class_template_specialization(node, NodeKind::ClassTemplateSpecializationDecl)
            }
            K::ClassTemplatePartialSpecializationDecl => {
                self.class_template_specialization(
                    node,
                    NodeKind::ClassTemplatePartialSpecializationDecl,
                )
            }
            K::FunctionTemplateDecl => self.function_template_decl(node),
            K::TypeAliasTemplateDecl => self.type_alias_template_decl(node),
            K::TemplateTypeParmDecl => self.template_type_parm_decl(node),
            K::NonTypeTemplateParmDecl => self.non_type_template_parm_decl(node),
            K::TemplateTemplateParmDecl => self.template_template_parm_decl(node),
            K::TemplateArgument => self.template_argument(node),

            // statements
            K::CompoundStmt => self.compound_stmt(node),
            K::DeclStmt => self.decl_stmt(node),
            K::ReturnStmt => self.return_stmt(node),
            K::IfStmt => self.if_stmt(node),
            K::WhileStmt => self.while_stmt(node),
            K::DoStmt => self.do_stmt(node),
            K::ForStmt => self.for_stmt(node),
            K::CXXForRangeStmt => self.for_range_stmt(node),
            K::SwitchStmt => self.switch_stmt(node),
            K::CaseStmt => self.case_stmt(node),
            K::DefaultStmt => self.default_stmt(node),
            K::LabelStmt => self.label_stmt(node),
            K::GotoStmt => self.goto_stmt(node),
            K::IndirectGotoStmt => self.wrap_one(node, NodeKind::IndirectGotoStmt, "expr"),
            K::AttributedStmt => self.attributed_stmt(node),
            K::CXXTryStmt => self.try_stmt(node),
            K::CXXCatchStmt => self.catch_stmt(node),
            K::GCCAsmStmt => self.asm_stmt(node),

            // expressions
            K::BinaryOperator => self.binary_operator(node, NodeKind::BinaryOperator),
            K::CompoundAssignOperator => {
                self.binary_operator(node, NodeKind::CompoundAssignOperator)
            }
            K::UnaryOperator => self.unary_operator(node),
            K::ConditionalOperator => self.conditional(node, NodeKind::ConditionalOperator),
            K::ChooseExpr => self.conditional(node, NodeKind::ChooseExpr),
            K::BinaryConditionalOperator => self.binary_conditional(node),
            K::ArraySubscriptExpr => self.array_subscript(node),
            K::CallExpr => self.call(node, NodeKind::CallExpr, "callee"),
            K::CXXMemberCallExpr => self.call(node, NodeKind::CXXMemberCallExpr, "bound_method"),
            K::CXXOperatorCallExpr => self.operator_call(node),
            K::MemberExpr => self.member_expr(node),
            K::DeclRefExpr => self.decl_ref_expr(node),
            K::IntegerLiteral => self.integer_literal(node),
            K::FloatingLiteral => self.floating_literal(node),
            K::ImaginaryLiteral => self.imaginary_literal(node),
            K::CharacterLiteral => self.character_literal(node),
            K::StringLiteral => self.scalar(node, NodeKind::StringLiteral, "value"),
            K::UserDefinedLiteral => self.user_defined_literal(node),
            K::CXXBoolLiteralExpr => self.scalar(node, NodeKind::CXXBoolLiteralExpr, "value"),
            K::CXXThisExpr => self.this_expr(node),
            K::ParenExpr => self.wrap_one(node, NodeKind::ParenExpr, "expr"),
            K::ParenListExpr => self.wrap_all(node, NodeKind::ParenListExpr, "exprs"),
            K::InitListExpr => self.wrap_all(node, NodeKind::InitListExpr, "values"),
            K::CXXStdInitializerListExpr => {
                self.wrap_all(node, NodeKind::CXXStdInitializerListExpr, "exprs")
            }
            K::CXXConstructExpr => self.wrap_all(node, NodeKind::CXXConstructExpr, "args"),
            K::ImplicitCastExpr => self.cast(node, NodeKind::ImplicitCastExpr),
            K::CStyleCastExpr => self.cast(node, NodeKind::CStyleCastExpr),
            K::CXXReinterpretCastExpr => self.cast(node, NodeKind::CXXReinterpretCastExpr),
            K::CXXFunctionalCastExpr => self.cast(node, NodeKind::CXXFunctionalCastExpr),
            K::BuiltinBitCastExpr => self.cast(node, NodeKind::BuiltinBitCastExpr),
            K::CXXStaticCastExpr => self.categorized_cast(node, NodeKind::CXXStaticCastExpr),
            K::CXXConstCastExpr => self.categorized_cast(node, NodeKind::CXXConstCastExpr),
            K::CXXTemporaryObjectExpr => self.temporary_object(node),
            K::CXXNewExpr => self.new_expr(node),
            K::CXXDeleteExpr => self.delete_expr(node),
            K::CXXThrowExpr => self.throw_expr(node),
            K::CXXTypeidExpr => self.type_or_expr(node, NodeKind::CXXTypeidExpr, "typeArg"),
            K::UnaryExprOrTypeTraitExpr => {
                self.type_or_expr(node, NodeKind::UnaryExprOrTypeTraitExpr, "argType")
            }
            K::ExprWithCleanups => self.wrap_one(node, NodeKind::ExprWithCleanups, "expr"),
            K::MaterializeTemporaryExpr => {
                self.wrap_one(node, NodeKind::MaterializeTemporaryExpr, "expr")
            }
            K::CXXBindTemporaryExpr => self.wrap_one(node, NodeKind::CXXBindTemporaryExpr, "expr"),
            K::OpaqueValueExpr => self.wrap_one(node, NodeKind::OpaqueValueExpr, "expr"),
            K::PackExpansionExpr => self.wrap_one(node, NodeKind::PackExpansionExpr, "expr"),
            K::StmtExpr => self.wrap_one(node, NodeKind::StmtExpr, "stmt"),
            K::ConstantExpr => self.constant_expr(node),
            K::AtomicExpr => self.atomic_expr(node),
            K::LambdaExpr => self.lambda_expr(node),
            K::SizeOfPackExpr => self.named(node, NodeKind::SizeOfPackExpr, "name"),
            K::UnresolvedLookupExpr => self.named(node, NodeKind::UnresolvedLookupExpr, "name"),
            K::AddrLabelExpr => self.named(node, NodeKind::AddrLabelExpr, "name"),
            K::PredefinedExpr => self.named(node, NodeKind::PredefinedExpr, "name"),
            K::VAArgExpr => self.va_arg_expr(node),
            K::OffsetOfExpr => self.offsetof_expr(node),
            K::OffsetOfField => self.named_as(node, NodeKind::OffsetOfField, "field", "name"),
            K::OffsetOfArray => self.offsetof_array(node),
            K::SubstNonTypeTemplateParmExpr => self.subst_non_type_template_parm_expr(node),
            K::CXXDefaultArgExpr | K::CXXDefaultInitExpr => Ok(None),

            // types
            K::BuiltinType => self.builtin_type(node),
            K::QualType => self.qual_type(node),
            K::PointerType => self.wrap_one(node, NodeKind::PointerType, "type"),
            K::LValueReferenceType => self.wrap_one(node, NodeKind::LValueReferenceType, "type"),
            K::RValueReferenceType => self.wrap_one(node, NodeKind::RValueReferenceType, "type"),
            K::IncompleteArrayType => self.wrap_one(node, NodeKind::IncompleteArrayType, "type"),
            K::ParenType => self.wrap_one(node, NodeKind::ParenType, "type"),
            K::DecayedType => self.wrap_one(node, NodeKind::DecayedType, "type"),
            K::SubstTemplateTypeParmType => {
                self.wrap_one(node, NodeKind::SubstTemplateTypeParmType, "type")
            }
            K::InjectedClassNameType => {
                self.wrap_one(node, NodeKind::InjectedClassNameType, "type")
            }
            K::PackExpansionType => self.wrap_one(node, NodeKind::PackExpansionType, "type"),
            K::ComplexType => self.wrap_one(node, NodeKind::ComplexType, "type"),
            K::MemberPointerType => self.member_pointer_type(node),
            K::ConstantArrayType => self.sized_type(node, NodeKind::ConstantArrayType),
            K::VectorType => self.sized_type(node, NodeKind::VectorType),
            K::DependentSizedArrayType => {
                self.dependent_array_type(node, NodeKind::DependentSizedArrayType)
            }
            K::VariableArrayType => self.dependent_array_type(node, NodeKind::VariableArrayType),
            K::ElaboratedType => self.elaborated_type(node),
            K::FunctionProtoType => self.function_proto_type(node),
            K::FunctionNoProtoType => self.marker(NodeKind::FunctionNoProtoType),
            K::RecordType => self.tag_type(node, NodeKind::RecordType),
            K::EnumType => self.tag_type(node, NodeKind::EnumType),
            K::TypedefType => self.typedef_type(node),
            K::TemplateTypeParmType => self.template_type_parm_type(node),
            K::TemplateSpecializationType => self.template_specialization_type(node),
            K::DependentNameType => self.dependent_name_type(node),
            K::AutoType => self.auto_type(node),
            K::DecltypeType => self.scalar_as(node, NodeKind::DecltypeType, "expr_repr", "repr"),
            K::TypeOfExprType => {
                self.scalar_as(node, NodeKind::TypeOfExprType, "expr_repr", "repr")
            }
            K::BitIntType => self.bit_int_type(node),

            // attributes
            K::AliasAttr => self.attr_arg(node, NodeKind::AliasAttr, "aliasee", "aliasee"),
            K::CleanupAttr => {
                self.attr_arg(node, NodeKind::CleanupAttr, "cleanup_function", "func")
            }
            K::SectionAttr => self.attr_arg(node, NodeKind::SectionAttr, "section_name", "section"),
            K::TLSModelAttr => {
                self.attr_arg(node, NodeKind::TLSModelAttr, "tls_model", "tls_model")
            }
            K::VisibilityAttr => {
                self.attr_arg(node, NodeKind::VisibilityAttr, "visibility", "visibility")
            }
            K::ErrorAttr => self.attr_arg(node, NodeKind::ErrorAttr, "message", "msg"),
            K::IFuncAttr => self.attr_arg(node, NodeKind::IFuncAttr, "name", "name"),
            K::AllocAlignAttr => {
                self.attr_arg(node, NodeKind::AllocAlignAttr, "source_index", "index")
            }
            K::FormatArgAttr => {
                self.attr_arg(node, NodeKind::FormatArgAttr, "fmt_index", "fmt_index")
            }
            K::DeprecatedAttr => self.message_attr(node, NodeKind::DeprecatedAttr),
            K::UnavailableAttr => self.message_attr(node, NodeKind::UnavailableAttr),
            K::ConstructorAttr => self.priority_attr(node, NodeKind::ConstructorAttr),
            K::DestructorAttr => self.priority_attr(node, NodeKind::DestructorAttr),
            K::AlignedAttr => self.aligned_attr(node),
            K::AllocSizeAttr => self.alloc_size_attr(node),
            K::FormatAttr => self.format_attr(node),
            K::NonNullAttr => self.list_attr(node, NodeKind::NonNullAttr, "indices"),
            K::NoSanitizeAttr => self.list_attr(node, NodeKind::NoSanitizeAttr, "options"),
            K::PatchableFunctionEntryAttr => self.patchable_function_entry_attr(node),
            K::SentinelAttr => self.sentinel_attr(node),
            K::TargetAttr => self.target_attr(node, NodeKind::TargetAttr),
            K::TargetClonesAttr => self.target_attr(node, NodeKind::TargetClonesAttr),
            K::WeakRefAttr => self.weak_ref_attr(node),
            K::UsedAttr => self.used_attr(node),
            K::RestrictAttr => self.marker(NodeKind::MallocAttr),
            K::NoReturnAttr => Ok(None),
            K::AlwaysInlineAttr
            | K::AnyX86InterruptAttr
            | K::CarriesDependencyAttr
            | K::ColdAttr
            | K::ConstAttr
            | K::CXX11NoReturnAttr
            | K::FallThroughAttr
            | K::FinalAttr
            | K::FlattenAttr
            | K::GNUInlineAttr
            | K::HotAttr
            | K::LeafAttr
            | K::LikelyAttr
            | K::NoInlineAttr
            | K::NoInstrumentFunctionAttr
            | K::NoProfileFunctionAttr
            | K::NoSplitStackAttr
            | K::NoStackProtectorAttr
            | K::NoUniqueAddressAttr
            | K::OverrideAttr
            | K::PackedAttr
            | K::PureAttr
            | K::RetainAttr
            | K::ReturnsNonNullAttr
            | K::ReturnsTwiceAttr
            | K::UninitializedAttr
            | K::UnlikelyAttr
            | K::UnusedAttr
            | K::WarnUnusedResultAttr
            | K::WeakAttr
            | K::NullStmt
            | K::BreakStmt
            | K::ContinueStmt
            | K::EmptyDecl
            | K::CXXNullPtrLiteralExpr
            | K::ImplicitValueInitExpr => self.marker(same_kind(kind)?),

            // comments are stripped on both sides of a round trip
            K::FullComment
            | K::ParagraphComment
            | K::TextComment
            | K::InlineCommandComment
            | K::BlockCommandComment
            | K::ParamCommandComment
            | K::TParamCommandComment
            | K::VerbatimBlockComment
            | K::VerbatimBlockLineComment
            | K::VerbatimLineComment
            | K::HTMLStartTagComment
            | K::HTMLEndTagComment => Ok(None),
        }
    }

    /// Builds the children under `inner`, dropping filtered ones.
    fn subnodes(&mut self, node: &'a Value) -> Result<Vec<CppAst>, BuildError> {
        let mut result = Vec::with_capacity(node.inner().len());
        for child in node.inner() {
            if let Some(built) = self.node(child)? {
                result.push(built);
            }
        }
        Ok(result)
    }

    /// Builds the children under `inner`, keeping a slot for filtered ones.
    fn subnodes_keep_empty(&mut self, node: &'a Value) -> Result<Vec<Option<CppAst>>, BuildError> {
        node.inner().iter().map(|child| self.node(child)).collect()
    }

    /// The single child of a node.
    fn only_child(&mut self, node: &'a Value) -> Result<CppAst, BuildError> {
        let mut children = self.subnodes(node)?;
        match children.len() {
            1 => Ok(children.remove(0)),
            found => Err(child_count(node, "1", found)),
        }
    }

    /// The single child of a node, if any.
    fn optional_child(&mut self, node: &'a Value) -> Result<Option<CppAst>, BuildError> {
        let mut children = self.subnodes(node)?;
        match children.len() {
            0 | 1 => Ok(children.pop()),
            found => Err(child_count(node, "0 or 1", found)),
        }
    }

    /// The summary record for the node's id.
    fn type_info(&self, node: &Value) -> Result<&'a Value, BuildError> {
        self.summary.types.get(node.id()).copied().ok_or_else(|| {
            BuildErrorKind::MalformedJson {
                node_id: node.id().into(),
                missing_key: "TypeSummary".into(),
            }
            .into()
        })
    }

    /// Builds the resolved type recorded in the summary for the node.
    fn resolved_type(&mut self, node: &'a Value) -> Result<CppAst, BuildError> {
        let info = self.type_info(node)?;
        self.node(info)?.ok_or_else(|| {
            BuildErrorKind::MalformedJson {
                node_id: node.id().into(),
                missing_key: "type".into(),
            }
            .into()
        })
    }

    /// An attribute argument recorded in the summary.
    fn attr_info(&self, node: &Value, key: &str) -> Option<&'a Value> {
        self.summary.attr(node.id(), key)
    }

    fn req_attr_info(&self, node: &Value, key: &str) -> Result<&'a Value, BuildError> {
        self
            .attr_info(node, key)
            .ok_or_else(|| json::missing(node, key))
    }

    fn marker(&self, kind: NodeKind) -> Built {
        make(kind, []).map(Some)
    }

    fn wrap_one(&mut self, node: &'a Value, kind: NodeKind, field: &'static str) -> Built {
        let child = self.only_child(node)?;
        make(kind, [(field, child.into())]).map(Some)
    }

    fn wrap_all(&mut self, node: &'a Value, kind: NodeKind, field: &'static str) -> Built {
        let children = self.subnodes(node)?;
        make(kind, [(field, children.into())]).map(Some)
    }

    /// A node whose only field is copied from a JSON string key of the same name.
    fn named(&mut self, node: &'a Value, kind: NodeKind, key: &'static str) -> Built {
        self.named_as(node, kind, key, key)
    }

    fn named_as(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
        key: &str,
        field: &'static str,
    ) -> Built {
        let name = node.req_str(key)?;
        make(kind, [(field, name.into())]).map(Some)
    }

    /// A node whose only field is a scalar rendered as a token.
    fn scalar(&mut self, node: &'a Value, kind: NodeKind, key: &'static str) -> Built {
        self.scalar_as(node, kind, key, key)
    }

    fn scalar_as(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
        key: &str,
        field: &'static str,
    ) -> Built {
        let value = json::scalar(node.req(key)?);
        make(kind, [(field, value.into())]).map(Some)
    }

    /// Opens the label scope of a function body.
    fn enter_function(&mut self) {
        self.labels.push(LabelScope::default());
    }

    /// Closes the label scope and patches the resolved goto targets into the
    /// function node.
    ///
    /// A goto whose label never showed up keeps its spelled target; without
    /// one there is nothing to render and the function fails to build.
    fn exit_function(&mut self, function: &mut Option<CppAst>) -> Result<(), BuildError> {
        let Some(scope) = self.labels.pop() else {
            return Ok(());
        };
        let mut unresolved = FxHashMap::default();
        for (&label, gotos) in &scope.pending {
            log::warn!("label {label} never seen by {} goto(s)", gotos.len());
            unresolved.extend(gotos.iter().map(|&goto| (goto, label)));
        }
        let Some(function) = function else {
            return Ok(());
        };
        if scope.resolved.is_empty() && unresolved.is_empty() {
            return Ok(());
        }
        let mut result = Ok(());
        function.walk_mut(&mut |node| {
            if *node.kind() != NodeKind::GotoStmt || result.is_err() {
                return;
            }
            if let Some(target) = scope.resolved.get(&node.seq()) {
                if let Err(err) = node.set("target", target.clone().into()) {
                    result = Err(err.into());
                }
            } else if let Some(&label) = unresolved.get(&node.seq()) {
                if node.token("target").unwrap_or_default().is_empty() {
                    result = Err(BuildErrorKind::UnresolvedLabel(label.into()).into());
                }
            }
        });
        result
    }

    /// Runs a function-like handler inside its own label scope.
    fn in_function(&mut self, f: impl FnOnce(&mut Self) -> Built) -> Built {
        self.enter_function();
        match f(self) {
            Ok(mut function) => {
                self.exit_function(&mut function)?;
                Ok(function)
            }
            Err(err) => {
                self.labels.pop();
                Err(err)
            }
        }
    }

    /// Records a label of the current function and resolves waiting gotos.
    fn declare_label(&mut self, id: &'a str, name: &str) {
        let Some(scope) = self.labels.last_mut() else {
            return;
        };
        scope.labels.insert(id, name.into());
        for goto in scope.pending.remove(id).unwrap_or_default() {
            scope.resolved.insert(goto, name.into());
        }
    }

    /// Resolves the target of a goto, or registers it for backpatching.
    fn reference_label(&mut self, id: &'a str, goto: u64) -> Option<CompactString> {
        let scope = self.labels.last_mut()?;
        if let Some(name) = scope.labels.get(id) {
            return Some(name.clone());
        }
        scope.pending.entry(id).or_default().push(goto);
        None
    }
}

/// Creates a native node, converting shape errors.
fn make<const N: usize>(
    kind: NodeKind,
    fields: [(&str, FieldValue<NodeKind>); N],
) -> Result<CppAst, BuildError> {
    Ok(CppAst::new(kind, fields)?)
}

/// The native kind sharing a clang kind's name.
fn same_kind(kind: ClangKind) -> Result<NodeKind, BuildError> {
    kind.name()
        .parse()
        .map_err(|()| BuildErrorKind::UnsupportedNodeKind(kind.name().into()).into())
}

fn child_count(node: &Value, expected: &str, found: usize) -> BuildError {
    BuildErrorKind::UnexpectedChildCount {
        kind: node.kind().unwrap_or_default().into(),
        expected: expected.into(),
        found,
    }
    .into()
}

fn unexpected_child(parent: &Value, child: &CppAst) -> BuildError {
    BuildErrorKind::UnexpectedChild {
        parent: parent.kind().unwrap_or_default().into(),
        child: child.kind().name().into(),
    }
    .into()
}

/// Wraps expressions and declarations so they can stand as statements.
fn as_statement(node: CppAst) -> Result<CppAst, BuildError> {
    match node.kind().category() {
        Category::Stmt => Ok(node),
        Category::Expr => make(NodeKind::ExprStmt, [("expr", node.into())]),
        Category::Decl => make(NodeKind::DeclStmt, [("decls", vec![node].into())]),
        _ => Err(BuildErrorKind::UnexpectedChild {
            parent: "statement".into(),
            child: node.kind().name().into(),
        }
        .into()),
    }
}

fn as_statements(nodes: Vec<CppAst>) -> Result<Vec<CppAst>, BuildError> {
    nodes.into_iter().map(as_statement).collect()
}

fn is(node: &CppAst, category: Category) -> bool {
    node.kind().category() == category
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_same_kind() {
        assert_eq!(same_kind(ClangKind::ColdAttr), Ok(NodeKind::ColdAttr));
        assert!(same_kind(ClangKind::RestrictAttr).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = BuildError {
            kind: BuildErrorKind::UnsupportedNodeKind("SomeFutureNode".into()),
            ancestors: vec!["FunctionDecl 0x1".into(), "CompoundStmt 0x2".into()],
        };
        assert_eq!(
            err.to_string(),
            "unsupported node kind `SomeFutureNode` (while visiting FunctionDecl 0x1 > CompoundStmt 0x2)"
        );
    }

    #[test]
    fn test_as_statement() {
        let expr = make(NodeKind::CXXThisExpr, []).unwrap();
        assert_eq!(*as_statement(expr).unwrap().kind(), NodeKind::ExprStmt);
        let decl = make(NodeKind::EmptyDecl, []).unwrap();
        assert_eq!(*as_statement(decl).unwrap().kind(), NodeKind::DeclStmt);
        let stmt = make(NodeKind::NullStmt, []).unwrap();
        assert_eq!(*as_statement(stmt).unwrap().kind(), NodeKind::NullStmt);
        assert!(as_statement(make(NodeKind::Public, []).unwrap()).is_err());
    }

    #[test]
    fn test_top_level_filter() {
        let options = BuildOptions::default();
        let mut builder = Builder::new("", &options);
        let header = json!({"kind": "TypedefDecl", "loc": {"file": "/usr/include/stdio.h", "includedFrom": {"file": "<stdin>"}}});
        assert_eq!(builder.drop_reason(&header), Some("included header"));
        let implicit = json!({"kind": "TypedefDecl", "isImplicit": true, "loc": {}});
        assert_eq!(builder.drop_reason(&implicit), Some("implicit"));
        let referenced = json!({"kind": "TypedefDecl", "isImplicit": true, "isReferenced": true, "loc": {}});
        assert_eq!(builder.drop_reason(&referenced), Some("implicit typedef"));
        let main = json!({"kind": "VarDecl", "loc": {"file": "<stdin>"}});
        assert_eq!(builder.drop_reason(&main), None);
        let unknown = json!({"kind": "VarDecl", "loc": {"offset": 4}});
        assert_eq!(builder.drop_reason(&unknown), None);
        builder.last_file = Some("a.h");
        assert_eq!(builder.drop_reason(&unknown), Some("other file"));
        assert_eq!(builder.drop_reason(&json!({"kind": "VarDecl"})), Some("no location"));
    }
}
