//! The closed set of native C++ AST node kinds.
//!
//! Every kind names the grammar type it belongs to and declares its fields
//! with their type and cardinality. The bundled grammar declares one
//! constructor per kind with the same fields in the same order.

use std::{fmt, str::FromStr};

use super::node::{Cardinality, FieldDecl, Kind};

/// The grammar type a native kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    TranslationUnit,
    Stmt,
    Decl,
    Expr,
    Type,
    Attr,
    TemplateArgument,
    ExceptionSpec,
    AccessSpec,
    Virtual,
    Defaulted,
    Base,
    CtorInitializer,
    ConstrainedExpr,
    DeclOrExpr,
    DeclsOrExpr,
    OffsetOfComponent,
    AutoKeyword,
    TemplateTag,
}

impl Category {
    /// The name of the grammar type.
    pub const fn type_name(self) -> &'static str {
        match self {
            Category::TranslationUnit => "translation_unit",
            Category::Stmt => "stmt",
            Category::Decl => "decl",
            Category::Expr => "expr",
            Category::Type => "type",
            Category::Attr => "attr",
            Category::TemplateArgument => "template_argument",
            Category::ExceptionSpec => "exception_spec",
            Category::AccessSpec => "access_spec",
            Category::Virtual => "virtual",
            Category::Defaulted => "defaulted",
            Category::Base => "base",
            Category::CtorInitializer => "ctor_initializer",
            Category::ConstrainedExpr => "constrained_expr",
            Category::DeclOrExpr => "decl_or_expr",
            Category::DeclsOrExpr => "decls_or_expr",
            Category::OffsetOfComponent => "offsetof_component",
            Category::AutoKeyword => "auto_keyword",
            Category::TemplateTag => "template_tag",
        }
    }
}

macro_rules! native_kinds {
    (@card One) => { Cardinality::Single };
    (@card Opt) => { Cardinality::Optional };
    (@card Many) => { Cardinality::Sequence };

    ($(
        $kind:ident: $category:ident $({ $($field:ident: $card:ident($ty:ident)),* $(,)? })?
    ),* $(,)?) => {
        /// A native C++ AST node kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NodeKind {
            $($kind,)*
        }

        impl NodeKind {
            /// All kinds, in declaration order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$kind,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$kind => stringify!($kind),)*
                }
            }

            pub const fn category(self) -> Category {
                match self {
                    $(NodeKind::$kind => Category::$category,)*
                }
            }

            pub fn field_decls(self) -> &'static [FieldDecl] {
                match self {
                    $(NodeKind::$kind => {
                        const FIELDS: &[FieldDecl] = &[
                            $($(FieldDecl::new_static(
                                stringify!($field),
                                stringify!($ty),
                                native_kinds!(@card $card),
                            ),)*)?
                        ];
                        FIELDS
                    })*
                }
            }
        }

        impl FromStr for NodeKind {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($kind) => Ok(NodeKind::$kind),)*
                    _ => Err(()),
                }
            }
        }
    };
}

native_kinds! {
    TranslationUnit: TranslationUnit { stmts: Many(stmt) },

    // Statements
    CompoundStmt: Stmt { stmts: Many(stmt) },
    DeclStmt: Stmt { decls: Many(decl) },
    ExprStmt: Stmt { expr: One(expr) },
    NullStmt: Stmt,
    ReturnStmt: Stmt { value: Opt(expr) },
    IfStmt: Stmt {
        constexpr: Opt(string),
        cond: One(decl_or_expr),
        true_body: One(stmt),
        false_body: Opt(stmt),
    },
    WhileStmt: Stmt { cond: One(decl_or_expr), body: One(stmt) },
    DoStmt: Stmt { body: One(stmt), cond: One(expr) },
    ForStmt: Stmt {
        init: Opt(decls_or_expr),
        cond: Opt(decl_or_expr),
        inc: Opt(expr),
        body: One(stmt),
    },
    CXXForRangeStmt: Stmt { decl: One(decl), range: One(expr), body: One(stmt) },
    BreakStmt: Stmt,
    ContinueStmt: Stmt,
    SwitchStmt: Stmt { cond: One(expr), body: One(stmt) },
    CaseStmt: Stmt { pattern: One(expr), pattern_end: Opt(expr), stmt: One(stmt) },
    DefaultStmt: Stmt { stmt: One(stmt) },
    LabelStmt: Stmt { name: One(identifier), stmt: One(stmt) },
    GotoStmt: Stmt { target: One(identifier) },
    IndirectGotoStmt: Stmt { expr: One(expr) },
    AttributedStmt: Stmt { attributes: Many(attr), stmt: One(stmt) },
    CXXTryStmt: Stmt { body: One(stmt), handlers: Many(stmt) },
    CXXCatchStmt: Stmt { decl: Opt(decl), body: One(stmt) },
    GCCAsmStmt: Stmt {
        string: One(string),
        output_operands: Many(constrained_expr),
        input_operands: Many(constrained_expr),
        clobbers: Many(string),
        labels: Many(identifier),
    },

    // Declarations
    FunctionDecl: Decl {
        name: One(identifier),
        return_type: Opt(type),
        trailing_return: Opt(string),
        parameters: Many(decl),
        variadic: Opt(string),
        inline: Opt(string),
        storage: Opt(string),
        attributes: Many(attr),
        defaulted: Opt(defaulted),
        exception: Opt(exception_spec),
        body: Opt(stmt),
    },
    CXXMethodDecl: Decl {
        name: One(identifier),
        return_type: One(type),
        trailing_return: Opt(string),
        parameters: Many(decl),
        variadic: Opt(string),
        inline: Opt(string),
        storage: Opt(string),
        virtual: Opt(virtual),
        const: Opt(string),
        ref_qualifier: Opt(string),
        method_attributes: Many(attr),
        attributes: Many(attr),
        defaulted: Opt(defaulted),
        exception: Opt(exception_spec),
        body: Opt(stmt),
    },
    CXXConstructorDecl: Decl {
        name: One(identifier),
        explicit: Opt(string),
        parameters: Many(decl),
        initializers: Many(ctor_initializer),
        attributes: Many(attr),
        defaulted: Opt(defaulted),
        exception: Opt(exception_spec),
        body: Opt(stmt),
    },
    CXXDestructorDecl: Decl {
        name: One(identifier),
        virtual: Opt(virtual),
        attributes: Many(attr),
        defaulted: Opt(defaulted),
        exception: Opt(exception_spec),
        body: Opt(stmt),
    },
    CXXConversionDecl: Decl {
        name: One(identifier),
        explicit: Opt(string),
        inline: Opt(string),
        const: Opt(string),
        attributes: Many(attr),
        exception: Opt(exception_spec),
        body: Opt(stmt),
    },
    ParmVarDecl: Decl {
        name: Opt(identifier),
        type: One(type),
        default: Opt(expr),
        attributes: Many(attr),
    },
    VarDecl: Decl {
        name: Opt(identifier),
        type: One(type),
        storage_class: Opt(string),
        tls: Opt(string),
        init_mode: Opt(string),
        implicit: Opt(string),
        referenced: Opt(string),
        init: Opt(expr),
        attributes: Many(attr),
    },
    FieldDecl: Decl {
        name: Opt(identifier),
        type: One(type),
        type_qualifier: Opt(string),
        bitwidth: Opt(expr),
        init: Opt(expr),
        attributes: Many(attr),
    },
    CXXRecordDecl: Decl {
        name: One(identifier),
        tag: One(string),
        bases: Many(base),
        complete: Opt(string),
        decls: Many(decl),
    },
    RecordDecl: Decl {
        name: One(identifier),
        tag: One(string),
        bases: Many(base),
        complete: Opt(string),
        decls: Many(decl),
    },
    ClassTemplateDecl: Decl { template_parameters: Many(decl), decl: One(decl) },
    ClassTemplateSpecializationDecl: Decl {
        name: One(identifier),
        tag: One(string),
        bases: Many(base),
        complete: Opt(string),
        template_arguments: Many(template_argument),
        template_parameters: Many(decl),
        decls: Many(decl),
    },
    ClassTemplatePartialSpecializationDecl: Decl {
        name: One(identifier),
        tag: One(string),
        bases: Many(base),
        complete: Opt(string),
        template_arguments: Many(template_argument),
        template_parameters: Many(decl),
        decls: Many(decl),
    },
    FunctionTemplateDecl: Decl { template_parameters: Many(decl), decl: One(decl) },
    TypeAliasTemplateDecl: Decl { template_parameters: Many(decl), decl: One(decl) },
    TemplateTypeParmDecl: Decl {
        name: Opt(identifier),
        tag: One(template_tag),
        default: Opt(type),
        parameter_pack: Opt(string),
    },
    NonTypeTemplateParmDecl: Decl {
        name: Opt(identifier),
        type: One(type),
        default: Opt(expr),
        parameter_pack: Opt(string),
    },
    TemplateTemplateParmDecl: Decl { name: Opt(identifier), template_parameters: Many(decl) },
    TypedefDecl: Decl { name: One(identifier), type: One(type) },
    TypeAliasDecl: Decl { name: One(identifier), type: One(type) },
    NamespaceDecl: Decl { name: Opt(identifier), inline: Opt(string), decls: Many(decl) },
    UsingDirectiveDecl: Decl { name: One(identifier) },
    UsingDecl: Decl { name: One(identifier) },
    StaticAssertDecl: Decl { cond: One(expr), message: Opt(string) },
    EnumDecl: Decl {
        name: Opt(identifier),
        scoped: Opt(string),
        underlying_type: Opt(string),
        fields: Many(decl),
    },
    EnumConstantDecl: Decl { name: One(identifier), init: Opt(expr) },
    AccessSpecDecl: Decl { access_spec: One(access_spec) },
    FriendDecl: Decl { type: One(string) },
    EmptyDecl: Decl,

    // Expressions
    BinaryOperator: Expr { opcode: One(string), lhs: One(expr), rhs: One(expr) },
    CompoundAssignOperator: Expr { opcode: One(string), lhs: One(expr), rhs: One(expr) },
    UnaryOperator: Expr { opcode: One(string), expr: One(expr), postfix: One(string) },
    ConditionalOperator: Expr { cond: One(expr), true_expr: One(expr), false_expr: One(expr) },
    BinaryConditionalOperator: Expr { cond: One(expr), false_expr: One(expr) },
    ChooseExpr: Expr { cond: One(expr), true_expr: One(expr), false_expr: One(expr) },
    ArraySubscriptExpr: Expr { base: One(expr), index: One(expr) },
    CallExpr: Expr { callee: One(expr), args: Many(expr) },
    CXXMemberCallExpr: Expr { bound_method: One(expr), args: Many(expr) },
    CXXOperatorCallExpr: Expr { op: One(expr), left: One(expr), right: Opt(expr) },
    MemberExpr: Expr { name: One(identifier), op: One(string), expr: Opt(expr) },
    DeclRefExpr: Expr { name: One(identifier) },
    IntegerLiteral: Expr { type: One(type), value: One(string) },
    FloatingLiteral: Expr { type: One(type), value: One(string) },
    ImaginaryLiteral: Expr { type: One(type), value: One(string) },
    CharacterLiteral: Expr { value: One(string) },
    StringLiteral: Expr { value: One(string) },
    UserDefinedLiteral: Expr { suffix: One(identifier), expr: One(expr) },
    CXXBoolLiteralExpr: Expr { value: One(string) },
    CXXNullPtrLiteralExpr: Expr,
    CXXThisExpr: Expr,
    ParenExpr: Expr { expr: One(expr) },
    ParenListExpr: Expr { exprs: Many(expr) },
    InitListExpr: Expr { values: Many(expr) },
    ImplicitCastExpr: Expr { type: One(type), expr: One(expr) },
    CStyleCastExpr: Expr { type: One(type), expr: One(expr) },
    CXXStaticCastExpr: Expr { type: One(type), expr: One(expr), value_category: One(string) },
    CXXConstCastExpr: Expr { type: One(type), expr: One(expr), value_category: One(string) },
    CXXReinterpretCastExpr: Expr { type: One(type), expr: One(expr) },
    CXXFunctionalCastExpr: Expr { type: One(type), expr: One(expr) },
    BuiltinBitCastExpr: Expr { type: One(type), expr: One(expr) },
    CXXConstructExpr: Expr { args: Many(expr) },
    CXXTemporaryObjectExpr: Expr { type: One(type), args: Many(expr) },
    CXXNewExpr: Expr {
        type: One(type),
        args: Many(expr),
        array_size: Opt(expr),
        placement: Opt(expr),
    },
    CXXDeleteExpr: Expr { expr: One(expr), is_array: Opt(string) },
    CXXThrowExpr: Expr { expr: Opt(expr) },
    CXXTypeidExpr: Expr { expr: Opt(expr), type: Opt(type) },
    CXXStdInitializerListExpr: Expr { exprs: Many(expr) },
    ExprWithCleanups: Expr { expr: One(expr) },
    MaterializeTemporaryExpr: Expr { expr: One(expr) },
    CXXBindTemporaryExpr: Expr { expr: One(expr) },
    ConstantExpr: Expr { expr: One(expr), result: Opt(string) },
    OpaqueValueExpr: Expr { expr: One(expr) },
    StmtExpr: Expr { stmt: One(stmt) },
    AtomicExpr: Expr { name: One(identifier), args: Many(expr) },
    UnaryExprOrTypeTraitExpr: Expr { name: One(identifier), expr: Opt(expr), type: Opt(type) },
    LambdaExpr: Expr {
        parameters: Many(decl),
        trailing_type: Opt(type),
        variadic: Opt(string),
        exception: Opt(exception_spec),
        attributes: Many(attr),
        capture_exprs: Many(expr),
        body: One(stmt),
    },
    SizeOfPackExpr: Expr { name: One(identifier) },
    UnresolvedLookupExpr: Expr { name: One(identifier) },
    PackExpansionExpr: Expr { expr: One(expr) },
    AddrLabelExpr: Expr { name: One(identifier) },
    VAArgExpr: Expr { expr: One(expr), type: One(type) },
    OffsetOfExpr: Expr { type: One(type), components: Many(offsetof_component) },
    PredefinedExpr: Expr { name: One(identifier) },
    SubstNonTypeTemplateParmExpr: Expr { decl: One(decl), expr: One(expr) },
    ImplicitValueInitExpr: Expr,

    OffsetOfField: OffsetOfComponent { name: One(identifier) },
    OffsetOfArray: OffsetOfComponent { index: One(expr) },

    // Types
    BuiltinType: Type { name: One(string) },
    QualType: Type { qualifiers: One(string), type: One(type) },
    PointerType: Type { type: One(type) },
    LValueReferenceType: Type { type: One(type) },
    RValueReferenceType: Type { type: One(type) },
    MemberPointerType: Type { cls: One(type), type: One(type) },
    ConstantArrayType: Type { type: One(type), size: One(string) },
    IncompleteArrayType: Type { type: One(type) },
    DependentSizedArrayType: Type { type: One(type), size_repr: One(string) },
    VariableArrayType: Type { type: One(type), size_repr: One(string) },
    ParenType: Type { type: One(type) },
    DecayedType: Type { type: One(type) },
    ElaboratedType: Type { qualifiers: Opt(string), type: One(type) },
    FunctionProtoType: Type {
        return_type: One(type),
        trailing_return: Opt(string),
        parameter_types: Many(type),
    },
    FunctionNoProtoType: Type,
    RecordType: Type { name: One(identifier) },
    EnumType: Type { name: One(identifier) },
    TypedefType: Type { name: One(identifier), type: One(type) },
    TemplateTypeParmType: Type { name: One(identifier) },
    SubstTemplateTypeParmType: Type { type: One(type) },
    InjectedClassNameType: Type { type: One(type) },
    TemplateSpecializationType: Type { name: One(string), template_args: Many(template_argument) },
    DependentNameType: Type { nested: One(string), attr: One(identifier) },
    AutoType: Type { keyword: One(auto_keyword) },
    DecltypeType: Type { repr: One(string) },
    TypeOfExprType: Type { repr: One(string) },
    PackExpansionType: Type { type: One(type) },
    ComplexType: Type { type: One(type) },
    VectorType: Type { type: One(type), size: One(string) },
    BitIntType: Type { size: One(string), sign: Opt(string) },

    Auto: AutoKeyword,
    DecltypeAuto: AutoKeyword,
    GNUAutoType: AutoKeyword,

    TypenameTag: TemplateTag,
    ClassTag: TemplateTag,

    TemplateArgument: TemplateArgument {
        type: Opt(type),
        expr: Opt(expr),
        pack: Many(template_argument),
    },

    Throw: ExceptionSpec { args: Many(type) },
    NoThrow: ExceptionSpec,
    NoExcept: ExceptionSpec { repr: Opt(string) },

    Public: AccessSpec,
    Protected: AccessSpec,
    Private: AccessSpec,

    Virtual: Virtual,

    Default: Defaulted,
    Delete: Defaulted,
    PureVirtual: Defaulted,

    Base: Base { access_spec: Opt(access_spec), virtual: Opt(virtual), name: One(string) },
    CXXCtorInitializer: CtorInitializer { name: One(string), args: Many(expr) },
    ConstrainedExpression: ConstrainedExpr { expr: One(expr), constraint: One(string) },
    DeclOrExpr: DeclOrExpr { decl: Opt(decl), expr: Opt(expr) },
    DeclsOrExpr: DeclsOrExpr { decls: Many(decl), expr: Opt(expr) },

    // Attributes
    AliasAttr: Attr { aliasee: One(string) },
    AlignedAttr: Attr { size: Opt(expr) },
    AllocAlignAttr: Attr { index: One(string) },
    AllocSizeAttr: Attr { size: One(string), nmemb: Opt(string) },
    AlwaysInlineAttr: Attr,
    AnyX86InterruptAttr: Attr,
    CarriesDependencyAttr: Attr,
    CleanupAttr: Attr { func: One(identifier) },
    ColdAttr: Attr,
    ConstAttr: Attr,
    ConstructorAttr: Attr { priority: Opt(string) },
    CXX11NoReturnAttr: Attr,
    DeprecatedAttr: Attr { msg: Opt(string) },
    DestructorAttr: Attr { priority: Opt(string) },
    ErrorAttr: Attr { msg: One(string) },
    FallThroughAttr: Attr,
    FinalAttr: Attr,
    FlattenAttr: Attr,
    FormatArgAttr: Attr { fmt_index: One(string) },
    FormatAttr: Attr {
        archetype: One(identifier),
        fmt_index: One(string),
        vargs_index: One(string),
    },
    GNUInlineAttr: Attr,
    HotAttr: Attr,
    IFuncAttr: Attr { name: One(identifier) },
    LeafAttr: Attr,
    LikelyAttr: Attr,
    MallocAttr: Attr,
    NoInlineAttr: Attr,
    NoInstrumentFunctionAttr: Attr,
    NonNullAttr: Attr { indices: Many(string) },
    NoProfileFunctionAttr: Attr,
    NoReturnAttr: Attr,
    NoSanitizeAttr: Attr { options: Many(string) },
    NoSplitStackAttr: Attr,
    NoStackProtectorAttr: Attr,
    NoUniqueAddressAttr: Attr,
    OverrideAttr: Attr,
    PackedAttr: Attr,
    PatchableFunctionEntryAttr: Attr { count: One(string), offset: Opt(string) },
    PureAttr: Attr,
    RetainAttr: Attr,
    ReturnsNonNullAttr: Attr,
    ReturnsTwiceAttr: Attr,
    SectionAttr: Attr { section: One(string) },
    SentinelAttr: Attr { value: Opt(string), offset: Opt(string) },
    TargetAttr: Attr { desc: One(string) },
    TargetClonesAttr: Attr { desc: One(string) },
    TLSModelAttr: Attr { tls_model: One(string) },
    UnavailableAttr: Attr { msg: Opt(string) },
    UninitializedAttr: Attr,
    UnlikelyAttr: Attr,
    UnusedAttr: Attr,
    UsedAttr: Attr,
    VisibilityAttr: Attr { visibility: One(string) },
    WarnUnusedResultAttr: Attr,
    WeakAttr: Attr,
    WeakRefAttr: Attr { name: Opt(string) },
}

impl NodeKind {
    /// Returns true for template parameter declarations.
    pub const fn is_template_parameter(self) -> bool {
        matches!(
            self,
            NodeKind::TemplateTypeParmDecl
                | NodeKind::NonTypeTemplateParmDecl
                | NodeKind::TemplateTemplateParmDecl
        )
    }
}

impl Kind for NodeKind {
    fn name(&self) -> &str {
        NodeKind::name(*self)
    }

    fn type_name(&self) -> &str {
        self.category().type_name()
    }

    fn fields(&self) -> &[FieldDecl] {
        self.field_decls()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NodeKind::name(*self))
    }
}
