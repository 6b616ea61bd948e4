use criterion::{Criterion, criterion_group, criterion_main};
use geo_fixture::compare::assert_table_contains;
use geo_fixture::{DbValue, Grid, Table};

fn row_compare_benchmark(c: &mut Criterion) {
    let ids: Vec<String> = (0..100).map(|id| id.to_string()).collect();
    let grid = Grid::from_rows([ids.iter().map(String::as_str)]).unwrap();

    let expected = Table::new(
        ["osm_id", "st_astext(way)"],
        (1..100).rev().map(|id| [id.to_string(), format!("{}, {id}", id - 1)]),
    )
    .unwrap();

    let rows: Vec<_> = (1..100)
        .map(|id| {
            let x = 20.0 + id as f64 * 0.1;
            [
                DbValue::Int(id),
                DbValue::Text(format!("LINESTRING({} 20,{x} 20)", x - 0.1)),
            ]
        })
        .collect();
    let actual = expected.actual_rows(rows).unwrap();

    c.bench_function("row_compare", |b| {
        b.iter(|| assert_table_contains(actual.clone(), &expected, &grid, true).unwrap());
    });
}

criterion_group!(benches, row_compare_benchmark);
criterion_main!(benches);
