use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic soil survey table (CSV and Parquet).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output path without extension
    #[arg(short, long, default_value = "dados_tcc_limpo_sem_extras")]
    output: PathBuf,

    /// Samples per point × depth cell
    #[arg(short, long, default_value_t = 6)]
    replicates: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const POINTS: [&str; 5] = ["P1", "P2", "P3", "P4", "P5"];
const DEPTHS: [&str; 2] = ["0-20", "20-40"];

/// Shape of one simulated variable.
struct Variable {
    name: &'static str,
    mean: f64,
    sd: f64,
    /// Added per sampling point.
    point_effect: [f64; 5],
    /// Added per depth.
    depth_effect: [f64; 2],
    /// Exponentiate the draw (right-skewed cations).
    log_normal: bool,
}

const VARIABLES: [Variable; 7] = [
    Variable {
        name: "PH_AGUA",
        mean: 5.6,
        sd: 0.25,
        point_effect: [0.0, 0.4, -0.3, 0.1, 0.6],
        depth_effect: [0.1, -0.1],
        log_normal: false,
    },
    Variable {
        name: "PH_CACL",
        mean: 4.9,
        sd: 0.25,
        point_effect: [0.0, 0.3, -0.3, 0.0, 0.5],
        depth_effect: [0.1, -0.1],
        log_normal: false,
    },
    Variable {
        name: "PH_KCL",
        mean: 4.4,
        sd: 0.2,
        point_effect: [0.0, 0.2, -0.2, 0.0, 0.4],
        depth_effect: [0.05, -0.05],
        log_normal: false,
    },
    Variable {
        name: "ACIDEZ",
        mean: 3.2,
        sd: 0.6,
        point_effect: [0.0, -0.8, 1.0, 0.2, -1.2],
        depth_effect: [-0.3, 0.3],
        log_normal: false,
    },
    Variable {
        name: "ALUMINIO",
        mean: 0.5,
        sd: 0.2,
        point_effect: [0.0, -0.2, 0.4, 0.1, -0.3],
        depth_effect: [-0.1, 0.1],
        log_normal: false,
    },
    Variable {
        name: "SODIO",
        mean: 1.5,
        sd: 0.45,
        point_effect: [0.0, 0.3, -0.2, 0.6, 0.1],
        depth_effect: [0.1, -0.1],
        log_normal: true,
    },
    Variable {
        name: "POTASSIO",
        mean: 3.8,
        sd: 0.5,
        point_effect: [0.0, 0.5, -0.4, 0.2, 0.8],
        depth_effect: [0.3, -0.3],
        log_normal: true,
    },
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Table {
    points: Vec<&'static str>,
    depths: Vec<&'static str>,
    /// One column per entry of `VARIABLES`.
    values: Vec<Vec<Option<f64>>>,
}

fn simulate(rng: &mut SimpleRng, replicates: usize) -> Table {
    let mut table = Table {
        points: Vec::new(),
        depths: Vec::new(),
        values: vec![Vec::new(); VARIABLES.len()],
    };
    for (p, point) in POINTS.iter().enumerate() {
        for (d, depth) in DEPTHS.iter().enumerate() {
            for _ in 0..replicates {
                table.points.push(*point);
                table.depths.push(*depth);
                for (column, var) in table.values.iter_mut().zip(&VARIABLES) {
                    // roughly one lab result in forty is missing
                    if rng.next_f64() < 0.025 {
                        column.push(None);
                        continue;
                    }
                    let centre = if var.log_normal { var.mean.ln() } else { var.mean };
                    let draw = rng.gauss(centre + var.point_effect[p] + var.depth_effect[d], var.sd);
                    let value = if var.log_normal { draw.exp() } else { draw.max(0.0) };
                    column.push(Some((value * 100.0).round() / 100.0));
                }
            }
        }
    }
    table
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["PONTOS", "PROFUNDIDADE"];
    header.extend(VARIABLES.iter().map(|v| v.name));
    writer.write_record(&header)?;

    for row in 0..table.points.len() {
        let mut record = vec![table.points[row].to_string(), table.depths[row].to_string()];
        record.extend(table.values.iter().map(|column| match column[row] {
            Some(v) => format!("{v}"),
            None => "NA".to_string(),
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let mut fields = vec![
        Field::new("PONTOS", DataType::Utf8, false),
        Field::new("PROFUNDIDADE", DataType::Utf8, false),
    ];
    fields.extend(
        VARIABLES
            .iter()
            .map(|v| Field::new(v.name, DataType::Float64, true)),
    );
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(table.points.clone())),
        Arc::new(StringArray::from(table.depths.clone())),
    ];
    columns.extend(
        table
            .values
            .iter()
            .map(|column| Arc::new(Float64Array::from(column.clone())) as ArrayRef),
    );
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = SimpleRng::new(args.seed);
    let table = simulate(&mut rng, args.replicates);

    let csv_path = args.output.with_extension("csv");
    let parquet_path = args.output.with_extension("parquet");
    write_csv(&table, &csv_path)?;
    write_parquet(&table, &parquet_path)?;

    log::info!("Seed {}, {} replicates per cell", args.seed, args.replicates);
    println!(
        "Wrote {} samples ({} points × {} depths) to {} and {}",
        table.points.len(),
        POINTS.len(),
        DEPTHS.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
