use std::{fmt, str::FromStr};

macro_rules! clang_kinds {
    ($($kind:ident),* $(,)?) => {
        /// A node kind the clang JSON dump can contain and the builder knows.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ClangKind {
            $($kind,)*
        }

        impl ClangKind {
            pub const ALL: &'static [ClangKind] = &[$(ClangKind::$kind,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(ClangKind::$kind => stringify!($kind),)*
                }
            }
        }

        impl FromStr for ClangKind {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($kind) => Ok(ClangKind::$kind),)*
                    _ => Err(()),
                }
            }
        }
    };
}

clang_kinds! {
    // declarations
    TranslationUnitDecl,
    FunctionDecl,
    CXXMethodDecl,
    CXXConstructorDecl,
    CXXDestructorDecl,
    CXXConversionDecl,
    CXXCtorInitializer,
    ParmVarDecl,
    VarDecl,
    FieldDecl,
    IndirectFieldDecl,
    CXXRecordDecl,
    RecordDecl,
    ClassTemplateDecl,
    ClassTemplateSpecializationDecl,
    ClassTemplatePartialSpecializationDecl,
    FunctionTemplateDecl,
    TypeAliasTemplateDecl,
    TemplateTypeParmDecl,
    NonTypeTemplateParmDecl,
    TemplateTemplateParmDecl,
    TemplateArgument,
    TypedefDecl,
    TypeAliasDecl,
    NamespaceDecl,
    UsingDirectiveDecl,
    UsingDecl,
    StaticAssertDecl,
    EnumDecl,
    EnumConstantDecl,
    AccessSpecDecl,
    FriendDecl,
    EmptyDecl,

    // statements
    CompoundStmt,
    DeclStmt,
    NullStmt,
    ReturnStmt,
    IfStmt,
    WhileStmt,
    DoStmt,
    ForStmt,
    CXXForRangeStmt,
    BreakStmt,
    ContinueStmt,
    SwitchStmt,
    CaseStmt,
    DefaultStmt,
    LabelStmt,
    GotoStmt,
    IndirectGotoStmt,
    AttributedStmt,
    CXXTryStmt,
    CXXCatchStmt,
    GCCAsmStmt,

    // expressions
    BinaryOperator,
    CompoundAssignOperator,
    UnaryOperator,
    ConditionalOperator,
    BinaryConditionalOperator,
    ChooseExpr,
    ArraySubscriptExpr,
    CallExpr,
    CXXMemberCallExpr,
    CXXOperatorCallExpr,
    MemberExpr,
    DeclRefExpr,
    IntegerLiteral,
    FloatingLiteral,
    ImaginaryLiteral,
    CharacterLiteral,
    StringLiteral,
    UserDefinedLiteral,
    CXXBoolLiteralExpr,
    CXXNullPtrLiteralExpr,
    CXXThisExpr,
    ParenExpr,
    ParenListExpr,
    InitListExpr,
    ImplicitCastExpr,
    CStyleCastExpr,
    CXXStaticCastExpr,
    CXXConstCastExpr,
    CXXReinterpretCastExpr,
    CXXFunctionalCastExpr,
    BuiltinBitCastExpr,
    CXXConstructExpr,
    CXXTemporaryObjectExpr,
    CXXNewExpr,
    CXXDeleteExpr,
    CXXThrowExpr,
    CXXTypeidExpr,
    CXXStdInitializerListExpr,
    CXXDefaultArgExpr,
    CXXDefaultInitExpr,
    ExprWithCleanups,
    MaterializeTemporaryExpr,
    CXXBindTemporaryExpr,
    ConstantExpr,
    OpaqueValueExpr,
    StmtExpr,
    AtomicExpr,
    UnaryExprOrTypeTraitExpr,
    LambdaExpr,
    SizeOfPackExpr,
    UnresolvedLookupExpr,
    PackExpansionExpr,
    AddrLabelExpr,
    VAArgExpr,
    OffsetOfExpr,
    OffsetOfField,
    OffsetOfArray,
    PredefinedExpr,
    SubstNonTypeTemplateParmExpr,
    ImplicitValueInitExpr,

    // types
    BuiltinType,
    QualType,
    PointerType,
    LValueReferenceType,
    RValueReferenceType,
    MemberPointerType,
    ConstantArrayType,
    IncompleteArrayType,
    DependentSizedArrayType,
    VariableArrayType,
    ParenType,
    DecayedType,
    ElaboratedType,
    FunctionProtoType,
    FunctionNoProtoType,
    RecordType,
    EnumType,
    TypedefType,
    TemplateTypeParmType,
    SubstTemplateTypeParmType,
    InjectedClassNameType,
    TemplateSpecializationType,
    DependentNameType,
    AutoType,
    DecltypeType,
    TypeOfExprType,
    PackExpansionType,
    ComplexType,
    VectorType,
    BitIntType,

    // attributes
    AliasAttr,
    AlignedAttr,
    AllocAlignAttr,
    AllocSizeAttr,
    AlwaysInlineAttr,
    AnyX86InterruptAttr,
    CarriesDependencyAttr,
    CleanupAttr,
    ColdAttr,
    ConstAttr,
    ConstructorAttr,
    CXX11NoReturnAttr,
    DeprecatedAttr,
    DestructorAttr,
    ErrorAttr,
    FallThroughAttr,
    FinalAttr,
    FlattenAttr,
    FormatArgAttr,
    FormatAttr,
    GNUInlineAttr,
    HotAttr,
    IFuncAttr,
    LeafAttr,
    LikelyAttr,
    NoInlineAttr,
    NoInstrumentFunctionAttr,
    NonNullAttr,
    NoProfileFunctionAttr,
    NoReturnAttr,
    NoSanitizeAttr,
    NoSplitStackAttr,
    NoStackProtectorAttr,
    NoUniqueAddressAttr,
    OverrideAttr,
    PackedAttr,
    PatchableFunctionEntryAttr,
    PureAttr,
    RestrictAttr,
    RetainAttr,
    ReturnsNonNullAttr,
    ReturnsTwiceAttr,
    SectionAttr,
    SentinelAttr,
    TargetAttr,
    TargetClonesAttr,
    TLSModelAttr,
    UnavailableAttr,
    UninitializedAttr,
    UnlikelyAttr,
    UnusedAttr,
    UsedAttr,
    VisibilityAttr,
    WarnUnusedResultAttr,
    WeakAttr,
    WeakRefAttr,

    // comments
    FullComment,
    ParagraphComment,
    TextComment,
    InlineCommandComment,
    BlockCommandComment,
    ParamCommandComment,
    TParamCommandComment,
    VerbatimBlockComment,
    VerbatimBlockLineComment,
    VerbatimLineComment,
    HTMLStartTagComment,
    HTMLEndTagComment,
}

impl fmt::Display for ClangKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
