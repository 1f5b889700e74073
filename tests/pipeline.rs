use std::fmt::Write as _;
use std::path::Path;

use soil_posthoc::config::{OutputConfig, PlotConfig, ReportConfig};
use soil_posthoc::{AnalysisConfig, AnalysisError};

/// Three points × two depths × four replicates; P2 clearly above P1.
fn write_survey(path: &Path) {
    let mut text = String::from("PONTOS;PROFUNDIDADE;PH_AGUA;SODIO\n");
    let jitter = [-0.12, 0.05, 0.11, -0.04];
    for (point, base) in [("P1", 5.0), ("P2", 6.2), ("P3", 5.4)] {
        for (depth, shift) in [("0-20", 0.1), ("20-40", -0.1)] {
            for (r, j) in jitter.iter().enumerate() {
                let ph = base + shift + j;
                let na = base * 2.0 + r as f64 * 0.3;
                writeln!(text, "{point};{depth};{ph:.2};{na:.2}").unwrap();
            }
        }
    }
    std::fs::write(path, text).unwrap();
}

fn config(dir: &Path) -> AnalysisConfig {
    AnalysisConfig {
        input: dir.join("dados.csv"),
        parametric: vec!["PH_AGUA".into()],
        nonparametric: vec!["SODIO".into()],
        factors: vec!["PONTOS".into(), "PROFUNDIDADE".into()],
        output: OutputConfig {
            dir: dir.join("saida"),
            ..Default::default()
        },
        plot: PlotConfig {
            dpi: 40.0,
            ..Default::default()
        },
        report: ReportConfig {
            page_dpi: 40.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn full_run_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    write_survey(&dir.path().join("dados.csv"));
    let config = config(dir.path());

    let summary = soil_posthoc::run(&config).unwrap();
    assert_eq!(summary.samples, 24);
    assert_eq!(summary.pairs, 4);
    assert_eq!(summary.plots.len(), 4);
    assert_eq!(summary.tables.len(), 6);
    for path in summary.outputs() {
        assert!(path.is_file(), "missing {}", path.display());
    }

    let out = dir.path().join("saida");
    assert!(out.join("graficos_tcc/PH_AGUA_PONTOS_boxplot.png").is_file());
    assert!(out.join("graficos_tcc/SODIO_PROFUNDIDADE_boxplot.png").is_file());

    let summary_csv = std::fs::read_to_string(out.join("resumo_estatistico_tcc.csv")).unwrap();
    let mut lines = summary_csv.lines();
    assert_eq!(
        lines.next(),
        Some("Variável;Fator;Nível;mean;std;count;Letra;Teste")
    );
    // 3 points + 2 depths, for each of the two variables
    assert_eq!(lines.count(), 10);

    let descriptive = std::fs::read_to_string(out.join("tabela_descritiva_tcc.csv")).unwrap();
    assert!(descriptive.starts_with("Variável;Fator;Nível;mean;median;min;max;std;count"));
    let omnibus = std::fs::read_to_string(out.join("testes_globais_tcc.csv")).unwrap();
    assert!(omnibus.starts_with("Variável;Fator;Teste;Estatística;gl;p"));

    // cover + 4 boxplots + one page per table
    let pdf = lopdf::Document::load(out.join("tcc_relatorio_completo.pdf")).unwrap();
    assert_eq!(pdf.get_pages().len(), 8);
    assert_eq!(summary.report_pages, 8);
}

#[test]
fn separated_points_get_different_letters() {
    let dir = tempfile::tempdir().unwrap();
    write_survey(&dir.path().join("dados.csv"));
    let config = config(dir.path());

    let dataset = soil_posthoc::data::loader::load_file(
        &config.input,
        &soil_posthoc::data::loader::LoadOptions::default(),
    )
    .unwrap();
    let analysis = soil_posthoc::analyze(&dataset, &config).unwrap();
    let ph = analysis.get("PH_AGUA", "PONTOS").unwrap();
    let letters: Vec<&str> = ph.groups.iter().map(|g| g.letters.as_str()).collect();
    // P2 highest, then P3, then P1, all apart
    assert_eq!(letters, vec!["c", "a", "b"]);
}

#[test]
fn missing_column_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    write_survey(&dir.path().join("dados.csv"));
    let mut config = config(dir.path());
    config.nonparametric.push("POTASSIO".into());

    let err = soil_posthoc::run(&config).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingColumn { ref column } if column == "POTASSIO"));
    assert!(!dir.path().join("saida/tcc_relatorio_completo.pdf").exists());
}

#[test]
fn text_in_numeric_column_names_the_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dados.csv");
    std::fs::write(
        &path,
        "PONTOS;PROFUNDIDADE;PH_AGUA;SODIO\nP1;0-20;5.1;2\nP2;0-20;abc;3\n",
    )
    .unwrap();

    let err = soil_posthoc::run(&config(dir.path())).unwrap_err();
    match err {
        AnalysisError::NonNumeric { row, column, value } => {
            // second data row, third line of the file
            assert_eq!(row, 2);
            assert_eq!(column, "PH_AGUA");
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }
}
