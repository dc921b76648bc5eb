/*!
End-to-end query tests over inline data sources.

Mirrors the built-in function corpus: aggregates over a five-row CSV
served from a base64 data URI, NULLIF division idioms, CAST forms and
scope-variable driven string functions. Results are compared as exact
display strings.
*/

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use iql::iql::datasource::new_source;
use iql::iql::sql::ast::{BinaryOperator, CastType, Expr};
use iql::iql::sql::execution::{FromBinding, Query, SelectItem};
use iql::iql::sql::scope::{self, Scope};
use iql::iql::sql::{Source, Type, Value};
use std::rc::Rc;

const BUILTIN_DATA: &str = "Year,IVal,FVal\n\
1970,100,100.5\n\
1971,200,200.5\n\
1972,300,300.5\n\
1973,400,400.5\n\
1974,500,500.5";

fn data_uri(content: &str) -> String {
    format!("data:text/csv;base64,{}", BASE64.encode(content))
}

fn session() -> Rc<Scope> {
    let scope = Scope::new();
    scope::init_system_variables(&scope).unwrap();
    scope
}

/// Builds `SELECT Year, IVal, FVal FROM data` over the test corpus.
fn corpus_query(scope: &Rc<Scope>) -> Query {
    let source = new_source(
        &data_uri(BUILTIN_DATA),
        "headers=true",
        vec![
            iql::ColumnSelector::new(iql::Reference::column("Year"), ""),
            iql::ColumnSelector::new(iql::Reference::column("IVal"), ""),
            iql::ColumnSelector::new(iql::Reference::column("FVal"), ""),
        ],
    )
    .unwrap();
    Query::new(
        vec![
            SelectItem::new(Expr::column("Year"), ""),
            SelectItem::new(Expr::column("IVal"), ""),
            SelectItem::new(Expr::column("FVal"), ""),
        ],
        vec![FromBinding::new(Some("data".to_string()), source)],
        None,
        Rc::clone(scope),
    )
    .unwrap()
}

fn result_strings(query: &mut Query) -> Vec<Vec<String>> {
    query
        .get()
        .unwrap()
        .into_iter()
        .map(|row| row.into_iter().map(|col| col.to_string()).collect())
        .collect()
}

/// Evaluates a one-column SELECT without FROM.
fn select_scalar(scope: &Rc<Scope>, expr: Expr) -> String {
    let mut query =
        Query::new(vec![SelectItem::new(expr, "")], Vec::new(), None, Rc::clone(scope)).unwrap();
    result_strings(&mut query)[0][0].clone()
}

#[test]
fn test_aggregates_over_subquery() {
    let scope = session();
    let cases: &[(&str, &str)] = &[
        ("AVG", "1972"),
        ("COUNT", "5"),
        ("MAX", "1974"),
        ("MIN", "1970"),
        ("SUM", "9860"),
    ];
    for (name, expected) in cases {
        let inner = corpus_query(&scope);
        let mut outer = Query::new(
            vec![SelectItem::new(
                Expr::function(*name, vec![Expr::column("Year")]),
                "",
            )],
            vec![FromBinding::new(None, Box::new(inner))],
            None,
            Rc::clone(&scope),
        )
        .unwrap();
        assert_eq!(
            result_strings(&mut outer),
            vec![vec![expected.to_string()]],
            "{}(Year)",
            name
        );
    }
}

#[test]
fn test_float_aggregates() {
    let scope = session();
    let inner = corpus_query(&scope);
    let mut outer = Query::new(
        vec![
            SelectItem::new(Expr::function("AVG", vec![Expr::column("FVal")]), ""),
            SelectItem::new(Expr::function("SUM", vec![Expr::column("FVal")]), ""),
        ],
        vec![FromBinding::new(None, Box::new(inner))],
        None,
        Rc::clone(&scope),
    )
    .unwrap();
    assert_eq!(
        result_strings(&mut outer),
        vec![vec!["300.5".to_string(), "1502.5".to_string()]]
    );
}

#[test]
fn test_nullif() {
    let scope = session();
    let nullif = |a: Value, b: Value| {
        Expr::function("NULLIF", vec![Expr::literal(a), Expr::literal(b)])
    };
    assert_eq!(
        select_scalar(&scope, nullif(Value::Int(4), Value::Int(4))),
        "NULL"
    );
    assert_eq!(
        select_scalar(&scope, nullif(Value::Int(5), Value::Int(4))),
        "5"
    );
}

#[test]
fn test_division_by_nullif() {
    let scope = session();
    let divide = |denominator: f64| Expr::Binary {
        left: Box::new(Expr::literal(Value::Int(5))),
        op: BinaryOperator::Divide,
        right: Box::new(Expr::function(
            "NULLIF",
            vec![
                Expr::literal(Value::Float(denominator)),
                Expr::literal(Value::Float(0.0)),
            ],
        )),
    };
    assert_eq!(select_scalar(&scope, divide(0.0)), "NULL");
    assert_eq!(select_scalar(&scope, divide(5.0)), "1");
}

#[test]
fn test_cast_forms() {
    let scope = session();
    let cast = |value: Value, typ: CastType| Expr::Cast {
        expr: Box::new(Expr::literal(value)),
        typ,
    };
    let cases: &[(Value, CastType, &str)] = &[
        (Value::Bool(false), CastType::Boolean, "false"),
        (Value::Bool(false), CastType::Varchar, "false"),
        (Value::Int(5), CastType::Integer, "5"),
        (Value::Int(5), CastType::Real, "5"),
        (Value::Int(5), CastType::Varchar, "5"),
        (Value::Float(5.0), CastType::Integer, "5"),
        (Value::Float(5.0), CastType::Real, "5"),
        (Value::Float(5.0), CastType::Varchar, "5"),
        (Value::String("5".to_string()), CastType::Integer, "5"),
        (Value::String("5".to_string()), CastType::Real, "5"),
        (Value::String("5".to_string()), CastType::Varchar, "5"),
    ];
    for (value, typ, expected) in cases {
        assert_eq!(
            select_scalar(&scope, cast(value.clone(), *typ)),
            *expected,
            "CAST({:?} AS {})",
            value,
            typ
        );
    }
}

#[test]
fn test_declared_variable_in_query() {
    // DECLARE nstring VARCHAR; SET nstring = 'Åkergatan 24';
    // SELECT UNICODE(nstring), NCHAR(UNICODE(nstring));
    let scope = session();
    scope.declare("nstring", Type::String, None);
    scope
        .set("nstring", Value::String("Åkergatan 24".to_string()))
        .unwrap();

    let unicode = Expr::function("UNICODE", vec![Expr::Variable("nstring".to_string())]);
    let mut query = Query::new(
        vec![
            SelectItem::new(unicode.clone(), ""),
            SelectItem::new(Expr::function("NCHAR", vec![unicode]), ""),
        ],
        Vec::new(),
        None,
        Rc::clone(&scope),
    )
    .unwrap();
    assert_eq!(
        result_strings(&mut query),
        vec![vec!["197".to_string(), "Å".to_string()]]
    );
}

#[test]
fn test_realfmt_drives_float_output() {
    let scope = session();
    scope
        .set(scope::SYS_REALFMT, Value::String("%.2f".to_string()))
        .unwrap();
    assert_eq!(
        select_scalar(&scope, Expr::literal(Value::Float(100.5))),
        "100.50"
    );

    scope
        .set(scope::SYS_REALFMT, Value::String("%g".to_string()))
        .unwrap();
    assert_eq!(
        select_scalar(&scope, Expr::literal(Value::Float(100.5))),
        "100.5"
    );
}

#[test]
fn test_datetime_functions_in_query() {
    let scope = session();
    assert_eq!(
        select_scalar(
            &scope,
            Expr::function(
                "YEAR",
                vec![Expr::literal(Value::String(
                    "2010-04-30T01:01:01.1234567-07:00".to_string()
                ))]
            )
        ),
        "2010"
    );
    assert_eq!(
        select_scalar(
            &scope,
            Expr::function("YEAR", vec![Expr::literal(Value::Int(0))])
        ),
        "1970"
    );

    let datediff = |unit: &str| {
        Expr::function(
            "DATEDIFF",
            vec![
                Expr::column(unit),
                Expr::literal(Value::String("2005-12-31 23:59:59.9999999".to_string())),
                Expr::literal(Value::String("2006-01-01 00:00:00.0000000".to_string())),
            ],
        )
    };
    assert_eq!(select_scalar(&scope, datediff("nanosecond")), "100");
    assert_eq!(select_scalar(&scope, datediff("second")), "1");
    assert_eq!(select_scalar(&scope, datediff("year")), "1");
}

#[test]
fn test_string_concat_operator() {
    let scope = session();
    let expr = Expr::Binary {
        left: Box::new(Expr::literal(Value::String("Hello, ".to_string()))),
        op: BinaryOperator::Add,
        right: Box::new(Expr::literal(Value::String("world!".to_string()))),
    };
    assert_eq!(
        select_scalar(&scope, Expr::function("LEFT", vec![expr, Expr::literal(Value::Int(6))])),
        "Hello,"
    );
}

#[test]
fn test_subquery_column_types() {
    let scope = session();
    let mut query = corpus_query(&scope);
    query.get().unwrap();

    let columns = query.columns();
    assert_eq!(columns[0].typ, iql::ColumnType::Int);
    assert_eq!(columns[1].typ, iql::ColumnType::Int);
    assert_eq!(columns[2].typ, iql::ColumnType::Float);
    assert!(columns.iter().all(|col| col.is_public()));
}
