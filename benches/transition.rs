use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use cpp_asdl::{builder::build, convert, grammar::Grammar, transition};

/// A translation unit of `count` functions `int fN(int x) { return x + N; }`.
fn document(count: usize) -> Value {
    let int = || json!({"kind": "BuiltinType", "type": {"qualType": "int"}});
    let mut summary = Vec::new();
    let mut decls = Vec::new();
    for n in 0..count {
        let id = |k: usize| format!("0x{:x}", n * 16 + k + 16);
        summary.push(json!({"node_id": id(0), "kind": "FunctionProtoType", "inner": [int(), int()]}));
        for k in [1, 4, 5, 7] {
            summary.push(json!({"node_id": id(k), "node_inner": [int()]}));
        }
        decls.push(json!({
            "id": id(0), "kind": "FunctionDecl", "loc": {"offset": 0, "file": "<stdin>"},
            "name": format!("f{n}"), "type": {"qualType": "int (int)"},
            "inner": [
                {"id": id(1), "kind": "ParmVarDecl", "name": "x"},
                {"id": id(2), "kind": "CompoundStmt", "inner": [
                    {"id": id(3), "kind": "ReturnStmt", "inner": [
                        {"id": id(4), "kind": "BinaryOperator", "opcode": "+", "inner": [
                            {"id": id(5), "kind": "ImplicitCastExpr", "inner": [
                                {"id": id(6), "kind": "DeclRefExpr", "referencedDecl": {"name": "x"}},
                            ]},
                            {"id": id(7), "kind": "IntegerLiteral", "value": n.to_string()},
                        ]},
                    ]},
                ]},
            ],
        }));
    }
    json!({
        "TypeSummary": summary,
        "Content": {"kind": "TranslationUnitDecl", "id": "0x1", "inner": decls},
    })
}

pub fn benchmark_transition(c: &mut Criterion) {
    let grammar = Grammar::cpp().expect("could not load the grammar");
    let document = document(200);
    let unit = build(&document, "").expect("could not build the tree");
    let asdl = convert::to_asdl(&unit, &grammar).expect("could not convert the tree");
    let actions = transition::encode(&asdl);

    c.bench_function("build 200 functions", |b| {
        b.iter(|| build(&document, "").unwrap())
    });
    c.bench_function("to_asdl 200 functions", |b| {
        b.iter(|| convert::to_asdl(&unit, &grammar).unwrap())
    });
    c.bench_function("encode 200 functions", |b| {
        b.iter(|| transition::encode(&asdl))
    });
    c.bench_function(&format!("decode {} actions", actions.len()), |b| {
        b.iter(|| transition::decode(&actions, &grammar).unwrap())
    });
}

criterion_group!(benches, benchmark_transition);
criterion_main!(benches);
