use sheetq_expr::{QueryModel, QueryOp, Projection, field, lit};
use sheetq_plan::{
    AggregateKind, ColumnProjection, QueryArgs, SourceTable, Terminal, translate,
};
use sheetq_result::Error;
use sheetq_types::CellValue;
use std::sync::Arc;

fn sheet1() -> QueryArgs {
    QueryArgs::new(SourceTable::Worksheet("Sheet1".into()))
}

fn filtered(predicate: sheetq_expr::Expr) -> QueryModel {
    QueryModel::new().with(QueryOp::Where(predicate))
}

#[test]
fn equality_with_constant_binds_exactly_one_parameter() {
    for constant in [
        CellValue::Int(7),
        CellValue::Text("ACME".into()),
        CellValue::Float(2.5),
        CellValue::Bool(false),
    ] {
        let out = translate(&filtered(field("Name").eq(constant.clone())), &sheet1()).unwrap();
        assert_eq!(out.statement.where_clause.as_deref(), Some("([Name] = ?)"));
        assert_eq!(out.statement.parameters, vec![constant]);
    }

    let out = translate(&filtered(field("Name").eq(CellValue::Null)), &sheet1()).unwrap();
    assert_eq!(out.statement.where_clause.as_deref(), Some("([Name] IS NULL)"));
    assert!(out.statement.parameters.is_empty());
}

#[test]
fn parameters_follow_source_order_across_clauses() {
    let model = QueryModel::new()
        .with(QueryOp::Where(field("EmployeeCount").gt(25).or(field("CEO").eq("Paul"))))
        .with(QueryOp::Where(field("Name").starts_with("A")));
    let out = translate(&model, &sheet1()).unwrap();
    assert_eq!(
        out.statement.render(),
        "SELECT * FROM [Sheet1$] WHERE ((([EmployeeCount] > ?) OR ([CEO] = ?)) AND ([Name] LIKE ?))"
    );
    assert_eq!(
        out.statement.parameters,
        vec![CellValue::Int(25), "Paul".into(), "A%".into()]
    );
}

#[test]
fn mapping_applies_to_filters_and_ordering_only_for_mapped_fields() {
    let args = sheet1().with_mapping("CEO", "Boss");
    let model = QueryModel::new()
        .with(QueryOp::Where(field("CEO").eq("Paul").and(field("Name").not_eq("X"))))
        .with(QueryOp::OrderBy {
            key: field("CEO"),
            descending: true,
        });
    let out = translate(&model, &args).unwrap();
    assert_eq!(
        out.statement.render(),
        "SELECT * FROM [Sheet1$] WHERE (([Boss] = ?) AND ([Name] <> ?)) ORDER BY [Boss] DESC"
    );
    assert_eq!(out.columns_used, vec!["Boss".to_string(), "Name".to_string()]);
}

#[test]
fn rendering_twice_is_byte_identical() {
    let model = QueryModel::new()
        .with(QueryOp::Where(lit(10).lt_eq(field("EmployeeCount"))))
        .with(QueryOp::OrderBy {
            key: field("Name"),
            descending: false,
        })
        .with(QueryOp::Take(3));
    let out = translate(&model, &sheet1()).unwrap();
    let first = out.statement.render();
    assert_eq!(first, out.statement.render());
    assert_eq!(
        first,
        "SELECT TOP 3 * FROM [Sheet1$] WHERE ([EmployeeCount] >= ?) ORDER BY [Name] ASC"
    );
}

#[test]
fn unsupported_operators_fail_regardless_of_the_rest() {
    for op in [
        QueryOp::Join,
        QueryOp::GroupBy,
        QueryOp::Union,
        QueryOp::Intersect,
        QueryOp::Except,
        QueryOp::Contains,
        QueryOp::DefaultIfEmpty,
        QueryOp::OfType,
        QueryOp::Single,
        QueryOp::SingleOrDefault,
        QueryOp::ThenBy {
            key: field("Name"),
            descending: false,
        },
    ] {
        let name = op.name();
        let simple = QueryModel::new().with(op.clone());
        assert!(
            matches!(translate(&simple, &sheet1()), Err(Error::UnsupportedOperation(msg)) if msg == name)
        );

        // an otherwise broken query still reports the operator
        let noisy = QueryModel::new()
            .with(QueryOp::Where(field("Name").to_upper().eq("X")))
            .with(op);
        assert!(matches!(
            translate(&noisy, &sheet1()),
            Err(Error::UnsupportedOperation(_))
        ));
    }
}

#[test]
fn source_tokens_reach_the_from_clause() {
    let named = QueryArgs::new(SourceTable::NamedRange {
        worksheet: Some("Sheet1".into()),
        name: "NamedRange".into(),
    });
    let out = translate(&QueryModel::new(), &named).unwrap();
    assert_eq!(out.statement.render(), "SELECT * FROM [Sheet1$NamedRange]");

    let range = QueryArgs::new(SourceTable::Range {
        worksheet: "Sheet1".into(),
        start: "A1".into(),
        end: "D4".into(),
    });
    let out = translate(&QueryModel::new(), &range).unwrap();
    assert_eq!(out.statement.render(), "SELECT * FROM [Sheet1$A1:D4]");
}

#[test]
fn distinct_requires_a_column_projection() {
    let model = QueryModel::new()
        .with(QueryOp::Select(Projection::Column(field("CEO"))))
        .with(QueryOp::Distinct);
    let out = translate(&model, &sheet1().with_mapping("CEO", "Boss")).unwrap();
    assert!(out.deferred.distinct);
    assert_eq!(
        out.projection,
        Some(ColumnProjection {
            logical: Some("CEO".into()),
            physical: "Boss".into()
        })
    );

    let whole_row = QueryModel::new().with(QueryOp::Distinct);
    assert!(matches!(
        translate(&whole_row, &sheet1()),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn aggregates_push_down_unless_a_fallback_applies() {
    let model = QueryModel::new()
        .with(QueryOp::Where(field("EmployeeCount").gt(1)))
        .with(QueryOp::OrderBy {
            key: field("Name"),
            descending: false,
        })
        .with(QueryOp::Sum(field("EmployeeCount")));
    let out = translate(&model, &sheet1()).unwrap();
    assert_eq!(
        out.statement.render(),
        "SELECT SUM([EmployeeCount]) FROM [Sheet1$] WHERE ([EmployeeCount] > ?)"
    );
    assert_eq!(out.terminal, Terminal::ServerAggregate(AggregateKind::Sum));

    let args = sheet1().with_transformation(
        "EmployeeCount",
        Arc::new(|raw: &str| CellValue::Int(raw.len() as i64)),
    );
    let out = translate(&QueryModel::new().with(QueryOp::Max(field("EmployeeCount"))), &args).unwrap();
    assert_eq!(out.statement.render(), "SELECT * FROM [Sheet1$]");
    assert!(matches!(
        out.terminal,
        Terminal::ClientAggregate {
            kind: AggregateKind::Max,
            column: Some(_)
        }
    ));

    let out = translate(
        &QueryModel::new().with(QueryOp::Take(2)).with(QueryOp::Count),
        &sheet1(),
    )
    .unwrap();
    assert_eq!(out.statement.render(), "SELECT TOP 2 * FROM [Sheet1$]");
    assert!(matches!(out.terminal, Terminal::ClientAggregate { .. }));
}

#[test]
fn headerless_sources_use_positional_tokens() {
    let args = sheet1().with_header(false);
    let model = filtered(sheetq_expr::column_at(0).eq("ACME"));
    let out = translate(&model, &args).unwrap();
    assert_eq!(out.statement.render(), "SELECT * FROM [Sheet1$] WHERE ([F1] = ?)");

    let by_name = filtered(sheetq_expr::column("Name").eq("ACME"));
    assert!(matches!(
        translate(&by_name, &args),
        Err(Error::InvalidArgumentError(_))
    ));
}
