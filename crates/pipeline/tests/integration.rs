//! End-to-end runs over real files in temp directories.

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use cnpj_io::{write_candidates, IoError};
use cnpj_pipeline::{
    generate_identifiers, run_ingest, run_lookup, run_pipeline, IngestConfig, LookupConfig, PipelineConfig,
    PipelineError,
};
use tempfile::{tempdir, TempDir};

/// 7-field Latin-1 registry row.
fn raw_row(id: &str, name: &str) -> Vec<u8> {
    let mut line = Vec::new();
    line.extend_from_slice(id.as_bytes());
    line.push(b';');
    line.extend(name.chars().map(|c| c as u32 as u8));
    line.extend_from_slice(b";2062;49;1000,00;01;\n");
    line
}

fn write_raw(dir: &Path, name: &str, rows: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    let bytes: Vec<u8> = rows.iter().flat_map(|(id, n)| raw_row(id, n)).collect();
    fs::write(dir.join(name), bytes).unwrap();
}

struct Workspace {
    _dir: TempDir,
    config: PipelineConfig,
}

fn workspace(export: &str) -> Workspace {
    let dir = tempdir().unwrap();
    let mut config = PipelineConfig::default();
    config.lookup.export = export.into();
    config.resolve_paths(dir.path());
    Workspace { _dir: dir, config }
}

fn read_csv(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

fn read_xlsx(path: &Path) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto(path).unwrap();
    let range = workbook.worksheet_range_at(0).unwrap().unwrap();
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::String(s) => s.clone(),
                    Data::Empty => String::new(),
                    other => panic!("unexpected cell {other:?}"),
                })
                .collect()
        })
        .collect()
}

#[test]
fn end_to_end_single_match() {
    let ws = workspace("nome_cnpj.xlsx");
    let cfg = &ws.config;
    write_raw(
        &cfg.ingest.input_dir,
        "K3241.K03200Y0.D40511.EMPRECSV",
        &[("11222333000199", "Alpha Ltd"), ("99888777000100", "Beta Ltd")],
    );
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["11222333000181"]).unwrap();

    let report = run_pipeline(cfg, &mut ()).unwrap();

    assert_eq!(report.ingest.total_rows, 2);
    assert_eq!(report.lookup.root_count, 1);
    assert_eq!(report.lookup.matched, 1);
    assert_eq!(
        read_xlsx(&cfg.lookup.export),
        vec![
            vec!["CNPJ_BÁSICO".to_string(), "RAZÃO_SOCIAL".to_string()],
            vec!["11222333000199".to_string(), "Alpha Ltd".to_string()],
        ]
    );
}

#[test]
fn latin1_names_survive_the_round_trip() {
    let ws = workspace("out.csv");
    let cfg = &ws.config;
    write_raw(&cfg.ingest.input_dir, "A", &[("12345678", "CONSTRUÇÕES SÃO JOSÉ")]);
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["12345678000195"]).unwrap();

    run_pipeline(cfg, &mut ()).unwrap();

    assert_eq!(
        read_csv(&cfg.lookup.export),
        ["CNPJ_BÁSICO,RAZÃO_SOCIAL", "12345678,CONSTRUÇÕES SÃO JOSÉ"]
    );
}

#[test]
fn empty_candidate_set_exports_header_only() {
    for export in ["out.csv", "out.xlsx"] {
        let ws = workspace(export);
        let cfg = &ws.config;
        write_raw(&cfg.ingest.input_dir, "A", &[("11222333", "Alpha")]);
        fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
        write_candidates::<&str>(&cfg.lookup.candidates, "ds_cnpj_usuf", &[]).unwrap();

        let report = run_pipeline(cfg, &mut ()).unwrap();
        assert_eq!(report.lookup.matched, 0);
        assert_eq!(report.lookup.rows_scanned, 1);

        if export.ends_with(".csv") {
            assert_eq!(read_csv(&cfg.lookup.export), ["CNPJ_BÁSICO,RAZÃO_SOCIAL"]);
        } else {
            assert_eq!(read_xlsx(&cfg.lookup.export).len(), 1);
        }
    }
}

#[test]
fn matched_rows_equal_sum_over_files() {
    let ws = workspace("out.csv");
    let cfg = &ws.config;
    let input = &cfg.ingest.input_dir;
    write_raw(input, "A", &[("11111111000100", "a1"), ("22222222000100", "a2"), ("33333333000100", "a3")]);
    write_raw(input, "B", &[("11111111000200", "b1"), ("44444444000100", "b2")]);
    write_raw(input, "C", &[("55555555000100", "c1")]);
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["11111111999999", "44444444000100"]).unwrap();

    let report = run_pipeline(cfg, &mut ()).unwrap();

    let per_file: Vec<u64> = report.lookup.files.iter().map(|f| f.matched).collect();
    assert_eq!(per_file, [1, 2, 0]);
    assert_eq!(report.lookup.matched, 3);
    assert_eq!(report.lookup.rows_scanned, 6);
    assert_eq!(
        read_csv(&cfg.lookup.export)[1..],
        ["11111111000100,a1", "11111111000200,b1", "44444444000100,b2"]
    );
}

#[test]
fn ingestion_is_idempotent() {
    let ws = workspace("out.csv");
    let cfg = &ws.config;
    let rows: Vec<(String, String)> = (0..500).map(|i| (format!("{i:08}0001"), format!("Empresa {i}"))).collect();
    let rows: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    write_raw(&cfg.ingest.input_dir, "A", &rows);
    write_raw(&cfg.ingest.input_dir, "B", &rows[..10]);

    let first = run_ingest(&cfg.ingest, &mut ()).unwrap();
    let second = run_ingest(&cfg.ingest, &mut ()).unwrap();

    assert_eq!(first.files, second.files);
    assert_eq!(first.total_rows, 510);
}

#[test]
fn scale_with_short_identifiers() {
    let ws = workspace("out.csv");
    let cfg = &ws.config;

    let ids = generate_identifiers(10_000, Some(2024)).unwrap();
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &ids).unwrap();

    let mut rows: Vec<(String, String)> = ids.iter().step_by(100).map(|id| (id[..8].to_string(), "hit".into())).collect();
    rows.push(("123".into(), "short".into()));
    rows.push((String::new(), "blank".into()));
    rows.push(("9".into(), "short".into()));
    let rows: Vec<(&str, &str)> = rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    write_raw(&cfg.ingest.input_dir, "A", &rows);

    let report = run_pipeline(cfg, &mut ()).unwrap();

    assert!(report.lookup.root_count <= 10_000);
    assert_eq!(report.lookup.candidate_count, 10_000);
    assert_eq!(report.lookup.matched, 100);
    assert_eq!(report.lookup.rows_scanned, 103);
}

#[test]
fn short_row_names_file_and_line() {
    let ws = workspace("out.csv");
    let cfg = &ws.config;
    fs::create_dir_all(&cfg.ingest.input_dir).unwrap();
    fs::write(cfg.ingest.input_dir.join("BROKEN"), "1;a;1;2;3;4;5\n2;b;1;2;3;4;5\n3;c;1\n").unwrap();

    let err = run_ingest(&cfg.ingest, &mut ()).unwrap_err();
    let PipelineError::Io(IoError::FieldCount { path, line, expected, found }) = &err else {
        panic!("expected FieldCount, got {err}");
    };
    assert!(path.ends_with("BROKEN"));
    assert_eq!((*line, *expected, *found), (3, 7, 3));
    let message = err.to_string();
    assert!(message.contains("BROKEN") && message.contains('3'), "{message}");
}

#[test]
fn undecodable_bytes_are_an_encoding_error() {
    let ws = workspace("out.csv");
    let mut ingest: IngestConfig = ws.config.ingest.clone();
    ingest.encoding = "utf-8".into();
    fs::create_dir_all(&ingest.input_dir).unwrap();
    fs::write(ingest.input_dir.join("A"), b"1;a;1;2;3;4;5\n2;\xff;1;2;3;4;5\n").unwrap();

    let err = run_ingest(&ingest, &mut ()).unwrap_err();
    assert!(matches!(err, PipelineError::Io(IoError::Encoding { line: 2, .. })), "{err}");
    assert!(!ingest.output_dir.join("A.parquet").exists());
}

#[test]
fn combined_file_is_not_double_counted() {
    let ws = workspace("out.csv");
    let mut cfg = ws.config.clone();
    cfg.ingest.combined_file = Some("combined.parquet".into());
    write_raw(&cfg.ingest.input_dir, "A", &[("11111111000100", "a1")]);
    write_raw(&cfg.ingest.input_dir, "B", &[("11111111000200", "b1")]);
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["11111111000100"]).unwrap();

    let report = run_pipeline(&cfg, &mut ()).unwrap();
    assert_eq!(report.ingest.combined.as_ref().map(|c| c.rows), Some(2));
    assert_eq!(report.lookup.files.len(), 2);
    assert_eq!(report.lookup.matched, 2);

    let lookup = LookupConfig {
        use_combined: true,
        ..cfg.lookup.clone()
    };
    let report = run_lookup(&lookup, cfg.combined_file(), &mut ()).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.matched, 2);
}

#[test]
fn separate_lookup_skips_the_combined_file() {
    let ws = workspace("out.csv");
    let mut cfg = ws.config.clone();
    cfg.ingest.combined_file = Some("all.parquet".into());
    write_raw(&cfg.ingest.input_dir, "A", &[("11111111000100", "a1")]);
    write_raw(&cfg.ingest.input_dir, "B", &[("11111111000200", "b1")]);
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["11111111000100"]).unwrap();

    run_ingest(&cfg.ingest, &mut ()).unwrap();

    // A later lookup that was never told the combined file's name
    let report = run_lookup(&cfg.lookup, None, &mut ()).unwrap();
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.matched, 2);
    assert_eq!(
        read_csv(&cfg.lookup.export)[1..],
        ["11111111000100,a1", "11111111000200,b1"]
    );

    let lookup = LookupConfig {
        use_combined: true,
        ..cfg.lookup.clone()
    };
    let report = run_lookup(&lookup, None, &mut ()).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.matched, 2);
}

#[test]
fn pipeline_scans_the_directory_ingest_wrote() {
    let ws = workspace("out.csv");
    let mut cfg = ws.config.clone();
    cfg.ingest.output_dir = cfg.ingest.output_dir.with_file_name("parquet");
    fs::create_dir_all(&cfg.lookup.columnar_dir).unwrap();
    write_raw(&cfg.ingest.input_dir, "A", &[("11222333000199", "Alpha Ltd"), ("11222333000280", "Alpha Filial")]);
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["11222333000181"]).unwrap();

    let report = run_pipeline(&cfg, &mut ()).unwrap();

    assert_eq!(report.lookup.files.len(), 1);
    assert!(report.lookup.files[0].path.starts_with(&cfg.ingest.output_dir));
    assert_eq!(report.lookup.matched, 2);
}

#[test]
fn latin1_control_range_is_kept_byte_for_byte() {
    let ws = workspace("out.csv");
    let cfg = &ws.config;
    fs::create_dir_all(&cfg.ingest.input_dir).unwrap();
    fs::write(cfg.ingest.input_dir.join("A"), b"12345678;A\x96B;1;2;3;4;5\n").unwrap();
    fs::create_dir_all(cfg.lookup.candidates.parent().unwrap()).unwrap();
    write_candidates(&cfg.lookup.candidates, "ds_cnpj_usuf", &["12345678000195"]).unwrap();

    run_pipeline(cfg, &mut ()).unwrap();

    let export = read_csv(&cfg.lookup.export);
    assert_eq!(export[1], "12345678,A\u{96}B");
}

#[test]
fn config_file_paths_are_relative_to_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cnpj.toml");
    fs::write(&path, "[ingest]\ninput_dir = \"raw\"\n[lookup]\nexport = \"hits.csv\"\n").unwrap();

    let cfg = PipelineConfig::load(&path).unwrap();
    assert_eq!(cfg.ingest.input_dir, dir.path().join("raw"));
    assert_eq!(cfg.lookup.export, dir.path().join("hits.csv"));

    let json = serde_json::to_value(&cfg).unwrap();
    assert_eq!(json["ingest"]["delimiter"], ";");
}
