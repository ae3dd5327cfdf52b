use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

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

struct Header<'a> {
    id: i64,
    type_exp: &'a str,
    type_theo: &'a str,
    type_current: &'a str,
    beams: [(f64, f64); 2],
    kin_var: &'a [&'a str],
}

/// Render one file: nine metadata lines, a reserved line, the grid header,
/// then one tab-separated row per point. `points` holds the KinVar values.
fn render(header: &Header, points: &[Vec<f64>], theory: impl Fn(&[f64]) -> f64, rng: &mut SimpleRng) -> String {
    let [(a1, z1), (a2, z2)] = header.beams;
    let mut columns: Vec<&str> = header.kin_var.to_vec();
    columns.extend(["data", "theory", "totErrorUncor", "chi2Corr"]);

    let mut lines = vec![
        format!("ID: {}", header.id),
        format!("TypeExp: {}", header.type_exp),
        format!("TypeTheo: {}", header.type_theo),
        format!("TypeCurrent: {}", header.type_current),
        format!("A1: {a1:.1}"),
        format!("A2: {a2:.1}"),
        format!("Z1: {z1:.1}"),
        format!("Z2: {z2:.1}"),
        format!("KinVar: [{}]", header.kin_var.join(", ")),
        "# synthetic sample, not a measurement".to_string(),
        columns.join("\t"),
    ];

    for point in points {
        let th = theory(point);
        let err = 0.05 * th.abs().max(1e-3);
        let data = rng.gauss(th, err);
        let chi2 = ((data - th) / err).powi(2);
        let mut fields: Vec<String> = point.iter().map(|v| format!("{v}")).collect();
        fields.extend([data, th, err, chi2].iter().map(|v| format!("{v:.6}")));
        lines.push(fields.join("\t"));
    }
    lines.join("\n") + "\n"
}

fn write(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// DIS grid: for each beam energy, (x, y) pairs with Q2 chosen so that the
/// derived energy rounds back to the nominal one.
fn dis_points(energies: &[f64]) -> Vec<Vec<f64>> {
    let xs = [0.01, 0.05, 0.1, 0.2, 0.4];
    let ys = [0.3, 0.5, 0.7];
    let mut points = Vec::new();
    for &e in energies {
        for &y in &ys {
            for &x in &xs {
                let q2 = 2.0 * 0.938 * e * x * y;
                points.push(vec![(q2 * 1e4).round() / 1e4, x, y]);
            }
        }
    }
    points
}

fn main() -> Result<()> {
    let out_dir = PathBuf::from(
        std::env::args()
            .nth(1)
            .unwrap_or_else(|| "sample_data".to_string()),
    );
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let mut rng = SimpleRng::new(42);

    let f2 = |p: &[f64]| 0.4 * (1.0 - p[1]).powi(3) * (1.0 + 0.1 * p[0].ln());

    let proton_carbon = render(
        &Header {
            id: 101,
            type_exp: "DISNEU",
            type_theo: "F2",
            type_current: "NC",
            beams: [(1.0, 1.0), (12.0, 6.0)],
            kin_var: &["Q2", "X", "Y"],
        },
        &dis_points(&[27.0, 100.0]),
        f2,
        &mut rng,
    );

    let proton_iron = render(
        &Header {
            id: 103,
            type_exp: "DISNEU",
            type_theo: "F2",
            type_current: "NC",
            beams: [(1.0, 1.0), (56.0, 26.0)],
            kin_var: &["Q2", "X", "Y"],
        },
        &dis_points(&[160.0]),
        f2,
        &mut rng,
    );

    let mut sia_points = Vec::new();
    for &pt in &[2.0, 4.0, 6.0, 8.0, 10.0] {
        for &rap in &[-1.0, 0.0, 1.0] {
            sia_points.push(vec![pt, rap]);
        }
    }
    let hadron = render(
        &Header {
            id: 202,
            type_exp: "SIA",
            type_theo: "dsigma",
            type_current: "EM",
            beams: [(12.0, 6.0), (197.0, 79.0)],
            kin_var: &["pT", "y"],
        },
        &sia_points,
        |p| 100.0 * (-0.5 * p[0]).exp() * (1.0 - 0.1 * p[1] * p[1]),
        &mut rng,
    );

    let written = [
        write(&out_dir, "101_disneu_pC.dat", &proton_carbon)?,
        write(&out_dir, "103_disneu_pFe.dat", &proton_iron)?,
        write(&out_dir, "202_sia_CAu.dat", &hadron)?,
    ];
    for path in &written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rusty_nucdata::data::layout;

    #[test]
    fn rendered_file_parses_back() {
        let mut rng = SimpleRng::new(7);
        let text = render(
            &Header {
                id: 7,
                type_exp: "SIA",
                type_theo: "dsigma",
                type_current: "EM",
                beams: [(1.0, 1.0), (12.0, 6.0)],
                kin_var: &["pT", "y"],
            },
            &[vec![2.0, 0.0], vec![4.0, 1.0]],
            |p| p[0],
            &mut rng,
        );
        assert!(text.ends_with('\n') && !text.ends_with("\n\n"));

        let raw = layout::parse(&text).unwrap();
        assert_eq!(raw.schema, vec!["pT", "y", "data", "theory", "totErrorUncor", "chi2Corr"]);
        assert_eq!(raw.rows.len(), 2);
        assert_eq!(raw.rows[1][..2], [4.0, 1.0]);
    }
}
