//! End-to-end transform and report scenarios over on-disk snapshots.

use chrono::NaiveDate;
use etl::config::SourcesConfig;
use etl::pipeline::{finish_run, transform_category, CategoryFrames};
use etl::reconcile::Reconciler;
use etl::schema::{CategorySchema, SHARED_FIELDS};
use etl::snapshot::{self, MonthLocale};
use etl::{ErrorKind, Frame, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

fn fecha() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 6, 9).unwrap()
}

fn write_snapshot(root: &Path, category: &str, content: &str) {
    let path = snapshot::snapshot_path(root, category, fecha(), MonthLocale::Es);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn no_nan(frame: &Frame) -> bool {
    frame
        .rows()
        .iter()
        .flatten()
        .all(|v| !matches!(v, Value::Float(f) if f.is_nan()))
}

const CINES_CSV: &str = "\
Cod_Loc,IdProvincia,IdDepartamento,Categoría,Provincia,Localidad,Nombre,Dirección,CP,Teléfono,Mail,Web,Fuente,Pantallas,Butacas,espacio_INCAA
14014010,14,14014,Salas de cine,Córdoba,Córdoba,Cine A,Av. Colón 1,5000,,,,RCC- Córdoba,3,,si
82084270,82,82084,Salas de cine,Santa Fé,Rosario,Cine B,Calle 2,2000,,,,INCAA,2,abc,SI
82084270,82,82084,Salas de cine,Santa Fé,Rosario,Cine C,Calle 3,2000,,,,INCAA,1,120,no
";

const MUSEOS_CSV: &str = "\
Cod_Loc,IdProvincia,IdDepartamento,Observaciones,categoria,subcategoria,provincia,localidad,nombre,direccion,piso,CP,cod_area,Teléfono,Mail,Web,Latitud,Longitud,TipoLatitudLongitud,Info_adicional,fuente,jurisdiccion,año_inicio,Año_actualizacion
6007010,6,6007,,Espacios de Exhibición Patrimonial,,Buenos Aires,Adolfo Alsina,Museo A,Calle 1,,6430,2936,1234,,,-37.1,-63.0,Localización precisa,,Gob. Pcia.,Provincial,,2017
94014020,94,94014,,Espacios de Exhibición Patrimonial,,Tierra del Fuego,Ushuaia,Museo B,Calle 2,,9410,2901,5678,,,-54.8,-68.3,Localización precisa,,SInCA,Municipal,,2017
";

#[test]
fn test_camel_case_extract_becomes_canonical_record() {
    let tmp = TempDir::new().unwrap();
    write_snapshot(tmp.path(), "museos", "codLoc,direccion,nombre\n001,Av. Siempre Viva 123,Cine X\n");

    let raw = snapshot::read_latest(tmp.path(), "museos", MonthLocale::Es).unwrap();
    let out = transform_category(raw, &CategorySchema::plain("museos"), &Reconciler::default()).unwrap();

    assert_eq!(out.columns(), SHARED_FIELDS);
    assert_eq!(out.height(), 1);
    assert_eq!(out.get(0, "cod_localidad"), Some(&Value::text("001")));
    assert_eq!(out.get(0, "domicilio"), Some(&Value::text("Av. Siempre Viva 123")));
    assert_eq!(out.get(0, "nombre"), Some(&Value::text("Cine X")));
    for field in SHARED_FIELDS {
        if !["cod_localidad", "domicilio", "nombre"].contains(field) {
            assert_eq!(out.get(0, field), Some(&Value::Null), "{} should be null", field);
        }
    }
}

#[test]
fn test_cinema_extract_coerces_and_reconciles() {
    let tmp = TempDir::new().unwrap();
    write_snapshot(tmp.path(), "salas_de_cine", CINES_CSV);

    let raw = snapshot::read_latest(tmp.path(), "salas_de_cine", MonthLocale::Es).unwrap();
    let out = transform_category(raw, &CategorySchema::cinemas(), &Reconciler::default()).unwrap();

    assert_eq!(out.width(), SHARED_FIELDS.len() + 3);
    assert_eq!(out.get(0, "butacas"), Some(&Value::Int(0)));
    assert_eq!(out.get(0, "espacio_incaa"), Some(&Value::Int(1)));
    assert_eq!(out.get(0, "fuente"), Some(&Value::text("RCC")));
    assert_eq!(out.get(0, "telefono"), Some(&Value::Null));
    assert_eq!(out.get(1, "butacas"), Some(&Value::Int(0)));
    assert_eq!(out.get(1, "provincia"), Some(&Value::text("Santa Fe")));
    assert_eq!(out.get(2, "butacas"), Some(&Value::Int(120)));
    assert_eq!(out.get(2, "espacio_incaa"), Some(&Value::Int(0)));
    assert!(no_nan(&out));
}

#[test]
fn test_full_run_reports() {
    let tmp = TempDir::new().unwrap();
    write_snapshot(tmp.path(), "salas_de_cine", CINES_CSV);
    write_snapshot(tmp.path(), "museos", MUSEOS_CSV);

    let config = SourcesConfig::from_json(
        r#"[
            {"category": "salas_de_cine", "link": "https://example.org/cines.csv"},
            {"category": "museos", "link": "https://example.org/museos.csv"},
            {"category": "bibliotecas_populares", "link": "https://example.org/bib.csv"}
        ]"#,
    )
    .unwrap();

    let reconciler = Reconciler::default();
    let mut frames = CategoryFrames::new();
    for source in config.selected(None) {
        let outcome = snapshot::read_latest(tmp.path(), &source.category, MonthLocale::Es)
            .and_then(|raw| transform_category(raw, &source.schema(), &reconciler));
        frames.record(&source.category, outcome);
    }

    // bibliotecas_populares has no snapshot and is left out
    assert_eq!(frames.omitted().len(), 1);
    assert_eq!(frames.omitted()[0].category, "bibliotecas_populares");

    let output = finish_run(Uuid::new_v4(), &frames, "salas_de_cine", fecha()).unwrap();
    assert_eq!(output.main.height(), 5);
    assert_eq!(output.main.columns(), SHARED_FIELDS);
    assert!(no_nan(&output.main));
    assert_eq!(
        output.summary.transformed,
        vec!["salas_de_cine".to_string(), "museos".to_string()]
    );

    let report_main = &output.reports.report_main;
    let category_total: i64 = (0..report_main.height())
        .filter(|&i| {
            report_main.get(i, "fuente") == Some(&Value::Null)
                && report_main.get(i, "provincia") == Some(&Value::Null)
        })
        .filter_map(|i| report_main.get(i, "cantidad").and_then(Value::as_i64))
        .sum();
    assert_eq!(category_total, 3 + 2);

    let fuentes: Vec<String> = (0..report_main.height())
        .filter_map(|i| report_main.get(i, "fuente").and_then(Value::as_text).map(String::from))
        .collect();
    assert_eq!(
        fuentes,
        vec!["Gobierno de la Provincia", "INCAA", "INCAA / SInCA", "RCC"]
    );

    let report_cinemas = &output.reports.report_cinemas;
    assert_eq!(report_cinemas.height(), 2);
    assert_eq!(
        report_cinemas.rows()[1],
        vec![
            Value::text("Santa Fe"),
            Value::Int(3),
            Value::Int(120),
            Value::Int(1),
            Value::Date(fecha()),
        ]
    );

    for frame in [report_main, report_cinemas] {
        for i in 0..frame.height() {
            assert_eq!(frame.get(i, "fecha_carga"), Some(&Value::Date(fecha())));
        }
    }
}

#[test]
fn test_run_without_cinema_category_fails_reports() {
    let tmp = TempDir::new().unwrap();
    write_snapshot(tmp.path(), "museos", MUSEOS_CSV);

    let mut frames = CategoryFrames::new();
    let outcome = snapshot::read_latest(tmp.path(), "museos", MonthLocale::Es)
        .and_then(|raw| transform_category(raw, &CategorySchema::plain("museos"), &Reconciler::default()));
    frames.record("museos", outcome);

    let err = finish_run(Uuid::new_v4(), &frames, "salas_de_cine", fecha()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AggregationInputInvalid);
}

#[test]
fn test_oversized_seat_counts_do_not_break_reports() {
    let tmp = TempDir::new().unwrap();
    let csv = "\
Provincia,Nombre,Categoría,Fuente,Pantallas,Butacas,espacio_INCAA
Salta,Cine A,Salas de cine,INCAA,1,1e19,si
Salta,Cine B,Salas de cine,INCAA,2,1e19,no
";
    write_snapshot(tmp.path(), "salas_de_cine", csv);

    let mut frames = CategoryFrames::new();
    let outcome = snapshot::read_latest(tmp.path(), "salas_de_cine", MonthLocale::Es)
        .and_then(|raw| transform_category(raw, &CategorySchema::cinemas(), &Reconciler::default()));
    frames.record("salas_de_cine", outcome);

    let output = finish_run(Uuid::new_v4(), &frames, "salas_de_cine", fecha()).unwrap();
    assert_eq!(
        output.reports.report_cinemas.rows()[0],
        vec![
            Value::text("Salta"),
            Value::Int(3),
            Value::Int(0),
            Value::Int(1),
            Value::Date(fecha()),
        ]
    );
}
