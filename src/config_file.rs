//! Whitespace-delimited text configuration and results files.
//!
//! Token order: span length, fixed node count, free node count, x bounds
//! (lo hi), y bounds (lo hi), strut count, that many `i j` pairs, then the
//! two support indices. Everything after the last header token is a list of
//! genotypes, one per line; blank lines and lines starting with `-` are
//! skipped.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::config::{checked_node_count, FixedNode, Interval, SpanBounds, Supports, TrussConfig};
use crate::error::{Result, TrussError};
use crate::genotype::Genotype;
use crate::topology::Topology;
use crate::types::DECK_PANEL_POINTS;

/// Marker line written ahead of best-of-run genotypes.
pub const BEST_OF_RUN_TAG: &str = "- Best of run";

/// A parsed configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: TrussConfig,
    /// Stored genotypes for replay.
    pub genotypes: Vec<Genotype>,
}

/// Header token reader that remembers where the header ended.
struct Tokens<'a> {
    lines: std::str::Lines<'a>,
    current: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            current: "",
        }
    }

    fn next_token(&mut self) -> Option<&'a str> {
        loop {
            let rest = self.current.trim_start();
            if rest.is_empty() {
                self.current = self.lines.next()?;
                continue;
            }
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let (token, tail) = rest.split_at(end);
            self.current = tail;
            return Some(token);
        }
    }

    fn parse<T: FromStr>(&mut self, field: &'static str) -> Result<T> {
        let token = self.next_token().ok_or(TrussError::MissingValue { field })?;
        token.parse().map_err(|_| TrussError::InvalidValue {
            field,
            value: token.to_string(),
        })
    }

    /// Unread text of the current line followed by the remaining lines.
    fn into_remaining_lines(self) -> impl Iterator<Item = &'a str> {
        std::iter::once(self.current).chain(self.lines)
    }
}

/// x position of the k-th fixed node in the text format.
fn fixed_node_x(k: usize, span_length: f64) -> f64 {
    DECK_PANEL_POINTS.get(k).copied().unwrap_or(span_length)
}

/// Parse a configuration and its stored genotypes.
pub fn parse_config(text: &str) -> Result<ConfigFile> {
    let mut tokens = Tokens::new(text);

    let span_length: f64 = tokens.parse("span length")?;
    let num_fixed: usize = tokens.parse("fixed node count")?;
    let num_free: usize = tokens.parse("free node count")?;
    if num_fixed < 2 {
        return Err(TrussError::InvalidValue {
            field: "fixed node count",
            value: num_fixed.to_string(),
        });
    }
    let num_nodes = checked_node_count(num_fixed, num_free)?;
    let x = Interval::new(tokens.parse("x lower bound")?, tokens.parse("x upper bound")?);
    let y = Interval::new(tokens.parse("y lower bound")?, tokens.parse("y upper bound")?);

    let num_struts: usize = tokens.parse("strut count")?;
    let max_struts = num_nodes as u64 * (num_nodes as u64 - 1) / 2;
    if num_struts as u64 > max_struts {
        return Err(TrussError::InvalidValue {
            field: "strut count",
            value: num_struts.to_string(),
        });
    }
    let pairs = (0..num_struts)
        .map(|_| -> Result<(usize, usize)> {
            Ok((tokens.parse("strut node")?, tokens.parse("strut node")?))
        })
        .collect::<Result<Vec<_>>>()?;

    let supports = Supports::new(tokens.parse("support A")?, tokens.parse("support B")?);

    let fixed_nodes = (0..num_fixed)
        .map(|k| FixedNode::new(fixed_node_x(k, span_length), 0.0))
        .collect();
    let topology = Topology::new(num_nodes, &pairs)?;
    let config = TrussConfig::new(
        span_length,
        fixed_nodes,
        num_free,
        SpanBounds::new(x, y),
        topology,
        supports,
    )?;

    let genotypes = tokens
        .into_remaining_lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .map(Genotype::from_str)
        .collect::<Result<Vec<_>>>()?;

    Ok(ConfigFile { config, genotypes })
}

/// Read and parse a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| TrussError::ConfigNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse_config(&text)?;
    log::info!(
        "loaded {}: {} nodes, {} struts, {} stored genotypes",
        path.display(),
        parsed.config.num_nodes(),
        parsed.config.num_struts(),
        parsed.genotypes.len()
    );
    Ok(parsed)
}

/// Append a best-of-run block to a results file, creating it if needed.
pub fn append_best_of_run(path: impl AsRef<Path>, genotypes: &[Genotype]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())?;
    writeln!(file, "{BEST_OF_RUN_TAG}")?;
    for genotype in genotypes {
        writeln!(file, "{genotype}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
14.0
6 2
0 14 0 5
7
0 1 1 2 2 3 3 4 4 5
6 0 7 5
6 7
- stored designs
0000
1111
";

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("truss-fitness-{}-{name}", std::process::id()))
    }

    #[test]
    fn header_is_read_in_order() {
        let parsed = parse_config(SAMPLE).unwrap();
        let config = &parsed.config;
        assert_eq!(config.span_length(), 14.0);
        assert_eq!(config.num_fixed(), 6);
        assert_eq!(config.num_free(), 2);
        assert_eq!(config.bounds().y, Interval::new(0.0, 5.0));
        assert_eq!(config.num_struts(), 7);
        assert_eq!(config.topology().strut_index(5, 7), Some(6));
        assert_eq!(config.supports(), Supports::new(6, 7));
    }

    #[test]
    fn fixed_nodes_sit_on_deck_panel_points() {
        let parsed = parse_config(SAMPLE).unwrap();
        let xs: Vec<f64> = parsed.config.fixed_nodes().iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 6.0, 8.0, 11.0, 14.0]);
        assert!(parsed.config.fixed_nodes().iter().all(|n| n.y == 0.0));
    }

    #[test]
    fn genotype_lines_skip_markers_and_blanks() {
        let parsed = parse_config(SAMPLE).unwrap();
        let lines: Vec<String> = parsed.genotypes.iter().map(|g| g.to_string()).collect();
        assert_eq!(lines, vec!["0000", "1111"]);
    }

    #[test]
    fn genotype_may_follow_supports_on_same_line() {
        let text = "4 2 1 0 4 0 2 2 0 2 1 2 0 1 0110\n\n1001\n";
        let parsed = parse_config(text).unwrap();
        assert_eq!(parsed.genotypes.len(), 2);
        assert_eq!(parsed.genotypes[0].to_string(), "0110");
    }

    #[test]
    fn truncated_header_reports_missing_field() {
        let err = parse_config("14.0 6 2 0 14 0").unwrap_err();
        assert!(matches!(err, TrussError::MissingValue { field: "y upper bound" }));
        assert!(err.is_configuration());
    }

    #[test]
    fn malformed_count_reports_value() {
        let err = parse_config("14.0 six 2").unwrap_err();
        assert!(matches!(
            err,
            TrussError::InvalidValue { field: "fixed node count", ref value } if value == "six"
        ));
    }

    #[test]
    fn huge_counts_are_configuration_errors() {
        for (text, field) in [
            ("14 18446744073709551615 1 0 14 0 5 0 0 1", "fixed node count"),
            ("14 2 9223372036854775807 0 14 0 5 0 0 1", "free node count"),
            ("14 40000 40000 0 14 0 5 0 0 1", "node count"),
            ("14 1 1 0 14 0 5 0 0 1", "fixed node count"),
            ("14 2 1 0 14 0 5 1000000000 0 1", "strut count"),
        ] {
            let err = parse_config(text).unwrap_err();
            assert!(err.is_configuration());
            assert!(
                matches!(err, TrussError::InvalidValue { field: f, .. } if f == field),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn strut_to_unknown_node_is_rejected() {
        let text = "4 2 1 0 4 0 2 1 0 9 0 1";
        assert!(matches!(
            parse_config(text).unwrap_err(),
            TrussError::InvalidTopology(_)
        ));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = load_config(temp_path("does-not-exist.cfg")).unwrap_err();
        assert!(matches!(err, TrussError::ConfigNotFound { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn best_of_run_block_is_appended() {
        let path = temp_path("results.txt");
        let _ = fs::remove_file(&path);
        fs::write(&path, SAMPLE).unwrap();

        let best: Vec<Genotype> = vec!["1010".parse().unwrap(), "0101".parse().unwrap()];
        append_best_of_run(&path, &best).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("- Best of run\n1010\n0101\n"));
        // the results file stays loadable and the tag line is skipped
        let reparsed = parse_config(&text).unwrap();
        assert_eq!(reparsed.genotypes.len(), 4);
        fs::remove_file(&path).unwrap();
    }
}
