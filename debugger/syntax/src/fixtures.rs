//! Small scripts together with their ESTree syntax trees, as an
//! ESTree-compatible parser would produce them with `locations` enabled.

use crate::ast::Program;
use serde_json::{json, Value};

pub const FOR_LOOP: &str = "for (let i = 0; i < 3; i++) {\n  x = i;\n}\n";
pub const FUNCTION_CALLS: &str =
    "function add(a, b) {\n  return a + b;\n}\nlet x = add(1, 2);\nlet y = add(x, 3);\n";
pub const SIBLING_CALLS: &str =
    "function add(a, b) {\n  return a + b;\n}\nlet z = add(1, 2) + add(3, 4);\n";
pub const METHOD_CALL: &str =
    "const counter = { count: 1, read: function () {\n  return this.count;\n} };\ncounter.read();\n";
pub const ACCUMULATE: &str = "let total = 0;\nfor (let i = 0; i < 3; i++) {\n  total = total + i;\n}\n";
pub const INFINITE_LOOP: &str = "let n = 0;\nwhile (true) {\n  n = n + 1;\n}\n";
pub const LOOPS: &str = "const items = [1, 2];\ndo {\n  items.pop();\n} while (items.length > 0);\nfor (const item of [3, 4]) {\n  debugger;\n}\nconst twice = (n) => n * 2;\n";

fn loc(start: (usize, usize), end: (usize, usize)) -> Value {
    json!({
        "start": { "line": start.0, "column": start.1 },
        "end": { "line": end.0, "column": end.1 },
    })
}
fn identifier(name: &str, line: usize, column: usize) -> Value {
    json!({
        "type": "Identifier",
        "name": name,
        "loc": loc((line, column), (line, column + name.len())),
    })
}
fn number(value: i64, line: usize, column: usize) -> Value {
    json!({
        "type": "Literal",
        "value": value,
        "raw": value.to_string(),
        "loc": loc((line, column), (line, column + value.to_string().len())),
    })
}
fn binary(operator: &str, left: Value, right: Value) -> Value {
    let loc = json!({ "start": left["loc"]["start"], "end": right["loc"]["end"] });
    json!({
        "type": "BinaryExpression",
        "operator": operator,
        "left": left,
        "right": right,
        "loc": loc,
    })
}
fn assignment(left: Value, right: Value) -> Value {
    let loc = json!({ "start": left["loc"]["start"], "end": right["loc"]["end"] });
    json!({
        "type": "AssignmentExpression",
        "operator": "=",
        "left": left,
        "right": right,
        "loc": loc,
    })
}
/// `kind id = init;` on a single line, including the semicolon.
fn declaration(kind: &str, id: Value, init: Value, end: (usize, usize)) -> Value {
    let declarator_loc = json!({ "start": id["loc"]["start"], "end": init["loc"]["end"] });
    json!({
        "type": "VariableDeclaration",
        "kind": kind,
        "declarations": [{
            "type": "VariableDeclarator",
            "id": id,
            "init": init,
            "loc": declarator_loc,
        }],
        "loc": loc((end.0, 0), end),
    })
}
fn expression_statement(expression: Value, end: (usize, usize)) -> Value {
    let start = expression["loc"]["start"].clone();
    json!({
        "type": "ExpressionStatement",
        "expression": expression,
        "loc": { "start": start, "end": { "line": end.0, "column": end.1 } },
    })
}
fn program(body: Vec<Value>, end: (usize, usize)) -> Program {
    let json = json!({
        "type": "Program",
        "sourceType": "script",
        "body": body,
        "loc": loc((1, 0), end),
    });
    serde_json::from_value(json).expect("Fixture is not a valid syntax tree.")
}

/// `for (let i = 0; i < 3; i++) { x = i; }`
#[must_use]
pub fn for_loop() -> Program {
    let for_statement = json!({
        "type": "ForStatement",
        "init": {
            "type": "VariableDeclaration",
            "kind": "let",
            "declarations": [{
                "type": "VariableDeclarator",
                "id": identifier("i", 1, 9),
                "init": number(0, 1, 13),
                "loc": loc((1, 9), (1, 14)),
            }],
            "loc": loc((1, 5), (1, 14)),
        },
        "test": binary("<", identifier("i", 1, 16), number(3, 1, 20)),
        "update": {
            "type": "UpdateExpression",
            "operator": "++",
            "prefix": false,
            "argument": identifier("i", 1, 23),
            "loc": loc((1, 23), (1, 26)),
        },
        "body": {
            "type": "BlockStatement",
            "body": [expression_statement(
                assignment(identifier("x", 2, 2), identifier("i", 2, 6)),
                (2, 8),
            )],
            "loc": loc((1, 28), (3, 1)),
        },
        "loc": loc((1, 0), (3, 1)),
    });
    program(vec![for_statement], (4, 0))
}

/// A function declaration that is called twice.
#[must_use]
pub fn function_calls() -> Program {
    program(
        vec![
            add_function(),
            declaration(
                "let",
                identifier("x", 4, 4),
                call_add((4, 8), number(1, 4, 12), number(2, 4, 15)),
                (4, 18),
            ),
            declaration(
                "let",
                identifier("y", 5, 4),
                call_add((5, 8), identifier("x", 5, 12), number(3, 5, 15)),
                (5, 18),
            ),
        ],
        (6, 0),
    )
}

/// Two calls of `add` in the same statement.
#[must_use]
pub fn sibling_calls() -> Program {
    let first = call_add((4, 8), number(1, 4, 12), number(2, 4, 15));
    let second = call_add((4, 20), number(3, 4, 24), number(4, 4, 27));
    program(
        vec![
            add_function(),
            declaration(
                "let",
                identifier("z", 4, 4),
                binary("+", first, second),
                (4, 30),
            ),
        ],
        (5, 0),
    )
}

/// `function add(a, b) { return a + b; }` on lines 1 to 3.
fn add_function() -> Value {
    json!({
        "type": "FunctionDeclaration",
        "id": identifier("add", 1, 9),
        "params": [identifier("a", 1, 13), identifier("b", 1, 16)],
        "body": {
            "type": "BlockStatement",
            "body": [{
                "type": "ReturnStatement",
                "argument": binary("+", identifier("a", 2, 9), identifier("b", 2, 13)),
                "loc": loc((2, 2), (2, 15)),
            }],
            "loc": loc((1, 19), (3, 1)),
        },
        "generator": false,
        "async": false,
        "loc": loc((1, 0), (3, 1)),
    })
}
fn call_add(start: (usize, usize), first: Value, second: Value) -> Value {
    json!({
        "type": "CallExpression",
        "callee": identifier("add", start.0, start.1),
        "arguments": [first, second],
        "loc": loc(start, (start.0, start.1 + 9)),
    })
}

/// A function called as a method of an object.
#[must_use]
pub fn method_call() -> Program {
    let read = json!({
        "type": "FunctionExpression",
        "id": null,
        "params": [],
        "body": {
            "type": "BlockStatement",
            "body": [{
                "type": "ReturnStatement",
                "argument": {
                    "type": "MemberExpression",
                    "object": { "type": "ThisExpression", "loc": loc((2, 9), (2, 13)) },
                    "property": identifier("count", 2, 14),
                    "computed": false,
                    "loc": loc((2, 9), (2, 19)),
                },
                "loc": loc((2, 2), (2, 20)),
            }],
            "loc": loc((1, 46), (3, 1)),
        },
        "generator": false,
        "async": false,
        "loc": loc((1, 34), (3, 1)),
    });
    let counter = json!({
        "type": "ObjectExpression",
        "properties": [
            {
                "type": "Property",
                "key": identifier("count", 1, 18),
                "value": number(1, 1, 25),
                "kind": "init",
                "computed": false,
                "loc": loc((1, 18), (1, 26)),
            },
            {
                "type": "Property",
                "key": identifier("read", 1, 28),
                "value": read,
                "kind": "init",
                "computed": false,
                "loc": loc((1, 28), (3, 1)),
            },
        ],
        "loc": loc((1, 16), (3, 3)),
    });
    let declaration = json!({
        "type": "VariableDeclaration",
        "kind": "const",
        "declarations": [{
            "type": "VariableDeclarator",
            "id": identifier("counter", 1, 6),
            "init": counter,
            "loc": loc((1, 6), (3, 3)),
        }],
        "loc": loc((1, 0), (3, 4)),
    });
    let read_call = json!({
        "type": "CallExpression",
        "callee": {
            "type": "MemberExpression",
            "object": identifier("counter", 4, 0),
            "property": identifier("read", 4, 8),
            "computed": false,
            "loc": loc((4, 0), (4, 12)),
        },
        "arguments": [],
        "loc": loc((4, 0), (4, 14)),
    });
    program(
        vec![declaration, expression_statement(read_call, (4, 15))],
        (5, 0),
    )
}

/// Sums `0 + 1 + 2` into `total`.
#[must_use]
pub fn accumulate() -> Program {
    let for_statement = json!({
        "type": "ForStatement",
        "init": {
            "type": "VariableDeclaration",
            "kind": "let",
            "declarations": [{
                "type": "VariableDeclarator",
                "id": identifier("i", 2, 9),
                "init": number(0, 2, 13),
                "loc": loc((2, 9), (2, 14)),
            }],
            "loc": loc((2, 5), (2, 14)),
        },
        "test": binary("<", identifier("i", 2, 16), number(3, 2, 20)),
        "update": {
            "type": "UpdateExpression",
            "operator": "++",
            "prefix": false,
            "argument": identifier("i", 2, 23),
            "loc": loc((2, 23), (2, 26)),
        },
        "body": {
            "type": "BlockStatement",
            "body": [expression_statement(
                assignment(
                    identifier("total", 3, 2),
                    binary("+", identifier("total", 3, 10), identifier("i", 3, 18)),
                ),
                (3, 20),
            )],
            "loc": loc((2, 28), (4, 1)),
        },
        "loc": loc((2, 0), (4, 1)),
    });
    program(
        vec![
            declaration("let", identifier("total", 1, 4), number(0, 1, 12), (1, 14)),
            for_statement,
        ],
        (5, 0),
    )
}

/// Never terminates on its own.
#[must_use]
pub fn infinite_loop() -> Program {
    let while_statement = json!({
        "type": "WhileStatement",
        "test": {
            "type": "Literal",
            "value": true,
            "raw": "true",
            "loc": loc((2, 7), (2, 11)),
        },
        "body": {
            "type": "BlockStatement",
            "body": [expression_statement(
                assignment(
                    identifier("n", 3, 2),
                    binary("+", identifier("n", 3, 6), number(1, 3, 10)),
                ),
                (3, 12),
            )],
            "loc": loc((2, 13), (4, 1)),
        },
        "loc": loc((2, 0), (4, 1)),
    });
    program(
        vec![
            declaration("let", identifier("n", 1, 4), number(0, 1, 8), (1, 10)),
            while_statement,
        ],
        (5, 0),
    )
}

/// `do … while`, `for … of`, a `debugger` statement and an arrow function.
#[must_use]
pub fn loops() -> Program {
    let items = json!({
        "type": "ArrayExpression",
        "elements": [number(1, 1, 15), number(2, 1, 18)],
        "loc": loc((1, 14), (1, 20)),
    });
    let do_while = json!({
        "type": "DoWhileStatement",
        "body": {
            "type": "BlockStatement",
            "body": [expression_statement(
                json!({
                    "type": "CallExpression",
                    "callee": {
                        "type": "MemberExpression",
                        "object": identifier("items", 3, 2),
                        "property": identifier("pop", 3, 8),
                        "computed": false,
                        "loc": loc((3, 2), (3, 11)),
                    },
                    "arguments": [],
                    "loc": loc((3, 2), (3, 13)),
                }),
                (3, 14),
            )],
            "loc": loc((2, 3), (4, 1)),
        },
        "test": binary(
            ">",
            json!({
                "type": "MemberExpression",
                "object": identifier("items", 4, 9),
                "property": identifier("length", 4, 15),
                "computed": false,
                "loc": loc((4, 9), (4, 21)),
            }),
            number(0, 4, 24),
        ),
        "loc": loc((2, 0), (4, 27)),
    });
    let for_of = json!({
        "type": "ForOfStatement",
        "await": false,
        "left": {
            "type": "VariableDeclaration",
            "kind": "const",
            "declarations": [{
                "type": "VariableDeclarator",
                "id": identifier("item", 5, 11),
                "init": null,
                "loc": loc((5, 11), (5, 15)),
            }],
            "loc": loc((5, 5), (5, 15)),
        },
        "right": {
            "type": "ArrayExpression",
            "elements": [number(3, 5, 20), number(4, 5, 23)],
            "loc": loc((5, 19), (5, 25)),
        },
        "body": {
            "type": "BlockStatement",
            "body": [{ "type": "DebuggerStatement", "loc": loc((6, 2), (6, 11)) }],
            "loc": loc((5, 27), (7, 1)),
        },
        "loc": loc((5, 0), (7, 1)),
    });
    let twice = json!({
        "type": "ArrowFunctionExpression",
        "id": null,
        "params": [identifier("n", 8, 15)],
        "body": binary("*", identifier("n", 8, 21), number(2, 8, 25)),
        "expression": true,
        "loc": loc((8, 14), (8, 26)),
    });
    program(
        vec![
            declaration("const", identifier("items", 1, 6), items, (1, 21)),
            do_while,
            for_of,
            declaration("const", identifier("twice", 8, 6), twice, (8, 27)),
        ],
        (9, 0),
    )
}
