use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use log::debug;

use super::cnf::{Clause, Lit, MAX_VAR};
use super::tseitin::normalize_negative_weights;
use super::weight::Weight;
use crate::error::{FormatError, FormatErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopWeight {
    Finite(Weight),
    /// Preamble omitted the top weight; resolved once parsing completes.
    Infinite,
}

impl TopWeight {
    pub fn admits_soft(&self, weight: &Weight) -> bool {
        match self {
            TopWeight::Finite(top) => weight < top,
            TopWeight::Infinite => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftClause {
    pub clause: Clause,
    pub weight: Weight,
    pub partition: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    #[default]
    Pwcnf,
    /// Plain weighted CNF; every soft clause lands in bucket 0.
    Wcnf,
}

impl Dialect {
    pub fn keyword(self) -> &'static str {
        match self {
            Dialect::Pwcnf => "pwcnf",
            Dialect::Wcnf => "wcnf",
        }
    }

    pub fn from_path(path: &Path) -> Dialect {
        match path.extension().and_then(|x| x.to_str()) {
            Some("wcnf") => Dialect::Wcnf,
            _ => Dialect::Pwcnf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub comment_lead: Vec<String>,
    pub dialect: Dialect,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            comment_lead: vec!["c".to_owned()],
            dialect: Dialect::Pwcnf,
        }
    }
}

impl ParseOptions {
    pub fn wcnf() -> Self {
        Self {
            dialect: Dialect::Wcnf,
            ..Self::default()
        }
    }
}

/// A normalized partitioned weighted CNF formula.
///
/// Soft clauses are stored grouped by partition, so each non-empty bucket is
/// a contiguous range of `soft` and concatenating the buckets gives `soft`
/// back in order. Only non-empty buckets are materialized; bucket indices
/// run over `0..num_partitions`. Every soft weight lies strictly between
/// zero and `top_weight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    num_vars: u32,
    input_vars: u32,
    hard: Vec<Clause>,
    hard_partitions: Vec<usize>,
    soft: Vec<SoftClause>,
    // non-empty buckets, ascending by index
    buckets: Vec<(usize, Range<usize>)>,
    num_partitions: usize,
    top_weight: Weight,
    offset: Weight,
    comments: Vec<String>,
}

impl Formula {
    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    /// Variables present before normalization allocated selectors.
    pub fn input_vars(&self) -> u32 {
        self.input_vars
    }

    pub fn hard(&self) -> &[Clause] {
        &self.hard
    }

    pub fn hard_with_partitions(&self) -> impl Iterator<Item = (&Clause, usize)> + '_ {
        self.hard.iter().zip(self.hard_partitions.iter().copied())
    }

    pub fn soft(&self) -> &[SoftClause] {
        &self.soft
    }

    /// Non-empty buckets in index order.
    pub fn partitions(&self) -> impl Iterator<Item = (usize, &[SoftClause])> + '_ {
        self.buckets.iter().map(|(p, r)| (*p, &self.soft[r.clone()]))
    }

    /// `None` past the last bucket. A bucket nothing was read into is empty.
    pub fn partition(&self, idx: usize) -> Option<&[SoftClause]> {
        if idx >= self.num_partitions {
            return None;
        }
        match self.buckets.binary_search_by_key(&idx, |(p, _)| *p) {
            Ok(i) => Some(&self.soft[self.buckets[i].1.clone()]),
            Err(_) => Some(&[][..]),
        }
    }

    pub fn partition_ranges(&self) -> &[(usize, Range<usize>)] {
        &self.buckets
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn top_weight(&self) -> &Weight {
        &self.top_weight
    }

    /// Sum of the declared non-positive weights. Adding it to a cost of the
    /// normalized formula gives the cost under the declared weights.
    pub fn offset(&self) -> &Weight {
        &self.offset
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn soft_weight_sum(&self) -> Weight {
        self.soft.iter().map(|s| &s.weight).sum()
    }

    /// Same formula with every soft clause moved into one bucket.
    pub fn with_single_partition(&self) -> Formula {
        let mut merged = self.clone();
        for s in &mut merged.soft {
            s.partition = 0;
        }
        merged.buckets = if merged.soft.is_empty() {
            Vec::new()
        } else {
            vec![(0, 0..merged.soft.len())]
        };
        merged.num_partitions = 1;
        merged
    }

    pub fn parse_str(s: &str, opts: &ParseOptions) -> Result<Formula, FormatError> {
        Self::parse_reader(std::io::Cursor::new(s.as_bytes()), opts)
    }

    pub fn parse_reader<R: BufRead>(r: R, opts: &ParseOptions) -> Result<Formula, FormatError> {
        let mut builder = None::<FormulaBuilder>;
        let mut comments = Vec::<String>::new();
        let mut last_line = 0usize;

        for (idx, line) in r.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            let line =
                line.map_err(|e| FormatError::new(line_no, FormatErrorKind::Io(e.to_string())))?;
            let clean = line.trim();
            if clean.is_empty() {
                continue;
            }

            let tokens = clean.split_whitespace().collect::<Vec<_>>();
            if tokens[0] == "p" {
                if builder.is_some() {
                    return Err(FormatError::new(line_no, FormatErrorKind::DuplicatePreamble));
                }
                builder = Some(parse_preamble(&tokens, opts.dialect, line_no, clean)?);
                continue;
            }

            if opts
                .comment_lead
                .iter()
                .any(|lead| !lead.is_empty() && clean.starts_with(lead.as_str()))
            {
                comments.push(clean.to_owned());
                continue;
            }

            let Some(b) = builder.as_mut() else {
                return Err(FormatError::new(line_no, FormatErrorKind::MissingPreamble));
            };
            parse_clause_line(b, &tokens, opts.dialect, line_no)?;
        }

        let mut b = builder
            .ok_or_else(|| FormatError::new(last_line, FormatErrorKind::MissingPreamble))?;
        b.comments = comments;
        b.build().map_err(|kind| FormatError::new(last_line, kind))
    }

    pub fn load(path: impl AsRef<Path>, opts: &ParseOptions) -> anyhow::Result<Formula> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let formula = Self::parse_reader(BufReader::new(file), opts)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(formula)
    }
}

impl FromStr for Formula {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse_str(s, &ParseOptions::default())
    }
}

fn parse_preamble(
    tokens: &[&str],
    dialect: Dialect,
    line_no: usize,
    line: &str,
) -> Result<FormulaBuilder, FormatError> {
    let bad = || FormatError::new(line_no, FormatErrorKind::BadPreamble(line.to_owned()));
    if tokens.len() < 2 || tokens[1] != dialect.keyword() {
        return Err(bad());
    }
    let counts = &tokens[2..];

    let (top, partitions) = match (dialect, counts.len()) {
        (Dialect::Pwcnf, 3) => (None, Some(counts[2])),
        (Dialect::Pwcnf, 4) => (Some(counts[2]), Some(counts[3])),
        (Dialect::Wcnf, 2) => (None, None),
        (Dialect::Wcnf, 3) => (Some(counts[2]), None),
        _ => return Err(bad()),
    };

    parse_usize(counts[0], "variable count", line_no)?;
    parse_usize(counts[1], "clause count", line_no)?;
    let top = match top {
        Some(tok) => TopWeight::Finite(parse_weight(tok, "top weight", line_no)?),
        None => TopWeight::Infinite,
    };
    let buckets = match partitions {
        Some(tok) => parse_usize(tok, "partition count", line_no)?
            .checked_add(1)
            .ok_or_else(|| FormatError::bad_token(line_no, "partition count", tok))?,
        None => 1,
    };

    Ok(FormulaBuilder::new(top).with_partitions(buckets))
}

fn parse_clause_line(
    builder: &mut FormulaBuilder,
    tokens: &[&str],
    dialect: Dialect,
    line_no: usize,
) -> Result<(), FormatError> {
    let truncated = || FormatError::new(line_no, FormatErrorKind::TruncatedClause);
    let Some((&last, body)) = tokens.split_last() else {
        return Err(truncated());
    };
    if last != "0" {
        return Err(FormatError::new(line_no, FormatErrorKind::MissingTerminator));
    }

    let (partition, rest) = match dialect {
        Dialect::Pwcnf => {
            let (&p, rest) = body.split_first().ok_or_else(truncated)?;
            let partition = parse_usize(p, "partition", line_no)?;
            // the bucket count is one past the largest index
            if partition == usize::MAX {
                return Err(FormatError::bad_token(line_no, "partition", p));
            }
            (partition, rest)
        }
        Dialect::Wcnf => (0, body),
    };
    let (&w, lits) = rest.split_first().ok_or_else(truncated)?;
    let weight = parse_weight(w, "weight", line_no)?;

    let mut clause = Vec::with_capacity(lits.len());
    for &tok in lits {
        let value = tok
            .parse::<i64>()
            .map_err(|_| FormatError::bad_token(line_no, "literal", tok))?;
        if value == 0 {
            return Err(FormatError::new(line_no, FormatErrorKind::InteriorZero));
        }
        let lit =
            Lit::from_dimacs(value).ok_or_else(|| FormatError::bad_token(line_no, "literal", tok))?;
        clause.push(lit);
    }

    builder.add_clause(clause, weight, partition);
    Ok(())
}

fn parse_usize(tok: &str, what: &'static str, line_no: usize) -> Result<usize, FormatError> {
    tok.parse::<usize>()
        .map_err(|_| FormatError::bad_token(line_no, what, tok))
}

fn parse_weight(tok: &str, what: &'static str, line_no: usize) -> Result<Weight, FormatError> {
    tok.parse::<Weight>()
        .map_err(|_| FormatError::bad_token(line_no, what, tok))
}

/// Collects clauses with their declared weights and produces a normalized
/// [`Formula`].
#[derive(Debug, Clone)]
pub struct FormulaBuilder {
    max_var: u32,
    top: TopWeight,
    num_partitions: usize,
    hard: Vec<(Clause, usize)>,
    soft: Vec<SoftClause>,
    negatives: Vec<SoftClause>,
    comments: Vec<String>,
}

impl FormulaBuilder {
    pub fn new(top: TopWeight) -> Self {
        Self {
            max_var: 0,
            top,
            num_partitions: 0,
            hard: Vec::new(),
            soft: Vec::new(),
            negatives: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Ensures at least `buckets` partition buckets exist, even empty ones.
    pub fn with_partitions(mut self, buckets: usize) -> Self {
        self.num_partitions = self.num_partitions.max(buckets);
        self
    }

    pub fn comment(&mut self, line: impl Into<String>) {
        self.comments.push(line.into());
    }

    pub fn add_hard(&mut self, clause: Clause, partition: usize) {
        self.note_clause(&clause, partition);
        self.hard.push((clause, partition));
    }

    /// Classifies by weight: at or above the top weight is hard, positive is
    /// soft, anything else waits for normalization.
    pub fn add_clause(&mut self, clause: Clause, weight: Weight, partition: usize) {
        self.note_clause(&clause, partition);
        if !weight.is_positive() {
            self.negatives.push(SoftClause {
                clause,
                weight,
                partition,
            });
        } else if self.top.admits_soft(&weight) {
            self.soft.push(SoftClause {
                clause,
                weight,
                partition,
            });
        } else {
            self.hard.push((clause, partition));
        }
    }

    fn note_clause(&mut self, clause: &[Lit], partition: usize) {
        if let Some(max) = clause.iter().map(|l| l.var).max() {
            self.max_var = self.max_var.max(max);
        }
        self.num_partitions = self.num_partitions.max(partition.saturating_add(1));
    }

    /// Normalizes and freezes the formula. Fails only when a variable id,
    /// read or allocated as a selector, exceeds [`MAX_VAR`].
    pub fn build(self) -> Result<Formula, FormatErrorKind> {
        if self.max_var > MAX_VAR {
            return Err(FormatErrorKind::TooManyVariables(MAX_VAR));
        }
        let mut num_vars = self.max_var;
        let input_vars = num_vars;
        let offset: Weight = self.negatives.iter().map(|c| &c.weight).sum();
        let num_negatives = self.negatives.len();

        let normalized = normalize_negative_weights(self.negatives, &mut num_vars, &self.top)?;
        if num_negatives > 0 {
            debug!(
                "normalized {} non-positive clauses: {} selectors, {} hard, {} soft",
                num_negatives,
                normalized.selectors,
                normalized.hard.len(),
                normalized.soft.len()
            );
        }

        let mut hard = self.hard;
        hard.extend(normalized.hard);
        let mut soft = self.soft;
        soft.extend(normalized.soft);

        let top_weight = match self.top {
            TopWeight::Finite(top) => top,
            TopWeight::Infinite => {
                let total: Weight = soft.iter().map(|s| &s.weight).sum();
                Weight::one() + total
            }
        };

        // stable, so file order survives inside each bucket
        soft.sort_by_key(|s| s.partition);
        let mut buckets = Vec::<(usize, Range<usize>)>::new();
        let mut start = 0usize;
        while start < soft.len() {
            let p = soft[start].partition;
            let mut end = start + 1;
            while end < soft.len() && soft[end].partition == p {
                end += 1;
            }
            buckets.push((p, start..end));
            start = end;
        }

        let (hard, hard_partitions) = hard.into_iter().unzip();
        Ok(Formula {
            num_vars,
            input_vars,
            hard,
            hard_partitions,
            soft,
            buckets,
            num_partitions: self.num_partitions,
            top_weight,
            offset,
            comments: self.comments,
        })
    }
}
