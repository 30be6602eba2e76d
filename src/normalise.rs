//! The unit registry normaliser.
//!
//! Source registers name and scale their columns differently. Each source is described by a
//! [`SourceMapping`] which says which column (or constant) supplies each canonical field and how
//! numeric values are converted into canonical units. One generic routine then turns the raw table
//! into [`UnitRecord`]s.
use crate::error::{Anomaly, PrepError, Stage};
use crate::technology::Technology;
use crate::unit::{UnitID, UnitRecord};
use crate::units::{Capacity, Dimensionless, MoneyPerCapacityPerYear, MoneyPerEnergy};
use crate::year::{Interpolation, interpolate_year};
use log::debug;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use unicase::UniCase;

const MINUTES_PER_HOUR: f64 = 60.0;

/// A field of the canonical unit schema
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[allow(missing_docs)]
pub enum Field {
    Id,
    Technology,
    FuelType,
    Region,
    NetCapacityMw,
    Efficiency,
    CommissioningYear,
    DecommissioningYear,
    VariableCost,
    FixedCost,
    MinLoadFactor,
    /// Share of net capacity per minute
    LoadGradient,
}

impl Field {
    /// Fields which every source must supply, either from a column or a constant
    pub const REQUIRED: [Field; 6] = [
        Field::Id,
        Field::Technology,
        Field::FuelType,
        Field::Region,
        Field::NetCapacityMw,
        Field::CommissioningYear,
    ];

    /// Whether the field holds a real number which may need unit conversion
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::NetCapacityMw
                | Field::Efficiency
                | Field::VariableCost
                | Field::FixedCost
                | Field::MinLoadFactor
                | Field::LoadGradient
        )
    }
}

/// A literal value given for a field in place of a column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// An integer (e.g. a year)
    Integer(i64),
    /// A real number
    Float(f64),
    /// A string
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

/// How the values of one numeric field are converted into canonical units
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConversion {
    /// Multiplier for each unit tag
    pub factors: BTreeMap<String, f64>,
    /// A unit tag shared by every record
    #[serde(default)]
    pub unit: Option<String>,
    /// The column holding each record's unit tag
    #[serde(default)]
    pub unit_column: Option<String>,
}

/// The character separating the integer and fractional parts of numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, DeserializeLabeledStringEnum)]
pub enum DecimalSeparator {
    /// e.g. `1234.5`
    #[default]
    #[string = "."]
    Point,
    /// e.g. `1234,5`
    #[string = ","]
    Comma,
}

/// The declarative description of one source register
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceMapping {
    /// Name of the source, used in reports and error messages
    pub name: String,
    /// CSV file holding the source's records, relative to the scenario directory
    pub file: PathBuf,
    /// Source column for each canonical field (matched case-insensitively)
    #[serde(default)]
    pub columns: BTreeMap<Field, String>,
    /// Values used for every record of the source
    #[serde(default)]
    pub constants: BTreeMap<Field, Literal>,
    /// Source technology labels and the technologies they stand for
    #[serde(default)]
    pub technology_aliases: BTreeMap<String, Technology>,
    /// Unit conversions for numeric fields
    #[serde(default)]
    pub conversions: BTreeMap<Field, UnitConversion>,
    /// Decimal separator used by the source
    #[serde(default)]
    pub decimal_separator: DecimalSeparator,
}

/// The header and rows of a source file, as strings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Column names
    pub headers: Vec<String>,
    /// Records, one string per column
    pub rows: Vec<Vec<String>>,
}

/// A source register together with its mapping
#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    /// How to interpret the table
    pub mapping: SourceMapping,
    /// The records
    pub table: RawTable,
}

/// Default efficiencies by technology and commissioning year, used to fill gaps
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EfficiencyDefaults(HashMap<Technology, Vec<(u32, f64)>>);

impl EfficiencyDefaults {
    /// Create from breakpoints, which must be sorted by year without duplicates
    pub fn new(breakpoints: HashMap<Technology, Vec<(u32, f64)>>) -> Self {
        Self(breakpoints)
    }

    /// The default efficiency of a unit of `technology` commissioned in `year`, if any
    pub fn get(&self, technology: Technology, year: u32) -> Option<Dimensionless> {
        let points = self.0.get(&technology)?;
        interpolate_year(points, year, Interpolation::Linear).map(Dimensionless)
    }
}

/// Why a record was excluded from the normalised output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    /// No capacity given
    MissingCapacity,
    /// Capacity is zero or negative
    NonPositiveCapacity,
    /// No commissioning year given
    MissingCommissioningYear,
    /// Decommissioning year is before the commissioning year
    DecommissionedBeforeCommissioning,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MissingCapacity => "missing capacity",
            Self::NonPositiveCapacity => "capacity <= 0",
            Self::MissingCommissioningYear => "missing commissioning year",
            Self::DecommissionedBeforeCommissioning => "decommissioned before commissioning",
        };
        write!(f, "{reason}")
    }
}

/// Counts of dropped and corrected records for one source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditReport {
    /// Name of the source
    pub source_name: String,
    /// Number of records in the source
    pub records_read: usize,
    /// Number of dropped records by reason
    pub dropped: BTreeMap<DropReason, usize>,
    /// Number of records whose efficiency was filled from the vintage defaults
    pub corrected: usize,
}

impl AuditReport {
    fn new(source_name: &str, records_read: usize) -> Self {
        Self {
            source_name: source_name.to_string(),
            records_read,
            ..Default::default()
        }
    }

    /// Total number of dropped records
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }

    /// The report's findings as anomalies, one per drop reason and one for corrections
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut anomalies = self
            .dropped
            .iter()
            .map(|(reason, count)| {
                Anomaly::new(
                    Stage::Normalise,
                    &self.source_name,
                    format!("{count} record(s) dropped: {reason}"),
                )
            })
            .collect::<Vec<_>>();
        if self.corrected > 0 {
            anomalies.push(Anomaly::new(
                Stage::Normalise,
                &self.source_name,
                format!(
                    "{} record(s) corrected: efficiency filled from vintage defaults",
                    self.corrected
                ),
            ));
        }

        anomalies
    }
}

/// The output of normalising all sources
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalisedUnits {
    /// Unit records of all sources which normalised successfully
    pub units: Vec<UnitRecord>,
    /// One report per successfully normalised source
    pub reports: Vec<AuditReport>,
    /// One error per failed source
    pub errors: Vec<PrepError>,
}

/// Normalise several sources.
///
/// A source which fails is excluded as a whole and its error recorded; the others are unaffected.
/// A unit ID already supplied by an earlier source fails the later source.
pub fn normalise_sources(sources: &[RawSource], defaults: &EfficiencyDefaults) -> NormalisedUnits {
    let mut output = NormalisedUnits::default();
    let mut seen_ids = HashSet::new();
    for source in sources {
        let result = normalise_source(source, defaults).and_then(|(units, report)| {
            if let Some(unit) = units.iter().find(|unit| seen_ids.contains(&unit.id)) {
                return Err(PrepError::schema(
                    &source.mapping.name,
                    format!("Unit ID {} is also used by another source", unit.id),
                ));
            }
            Ok((units, report))
        });

        match result {
            Ok((units, report)) => {
                seen_ids.extend(units.iter().map(|unit| unit.id.clone()));
                output.units.extend(units);
                output.reports.push(report);
            }
            Err(err) => output.errors.push(err),
        }
    }

    output
}

/// Normalise the records of one source.
///
/// # Returns
///
/// The normalised records and an audit report, or a [`PrepError::Schema`] if the mapping does not
/// fit the table or a record cannot be interpreted.
pub fn normalise_source(
    source: &RawSource,
    defaults: &EfficiencyDefaults,
) -> Result<(Vec<UnitRecord>, AuditReport), PrepError> {
    let mapping = &source.mapping;
    let resolved = ResolvedMapping::new(mapping, &source.table.headers)
        .map_err(|msg| PrepError::schema(&mapping.name, msg))?;

    let mut report = AuditReport::new(&mapping.name, source.table.rows.len());
    let mut units = Vec::new();
    let mut ids = HashSet::new();
    for (idx, row) in source.table.rows.iter().enumerate() {
        let parser = RecordParser {
            mapping,
            resolved: &resolved,
            row,
            record_no: idx + 1,
        };
        let unit = match parser
            .parse(defaults)
            .map_err(|msg| PrepError::schema(&mapping.name, msg))?
        {
            ParsedRecord::Unit { unit, corrected } => {
                report.corrected += usize::from(corrected);
                unit
            }
            ParsedRecord::Dropped(reason) => {
                *report.dropped.entry(reason).or_default() += 1;
                continue;
            }
        };

        if !ids.insert(unit.id.clone()) {
            return Err(PrepError::schema(
                &mapping.name,
                format!("Duplicate unit ID: {}", unit.id),
            ));
        }
        units.push(unit);
    }

    debug!(
        "Source '{}': {} records read, {} dropped, {} corrected",
        mapping.name,
        report.records_read,
        report.dropped_total(),
        report.corrected
    );

    Ok((units, report))
}

/// Where the values of a field come from
#[derive(Debug)]
enum ValueSource {
    Column(usize),
    Constant(String),
    /// A numeric constant, always written with a decimal point
    Number(String),
}

/// How the unit tag of a numeric field is determined
#[derive(Debug)]
enum UnitSource<'a> {
    Fixed(f64),
    Column {
        index: usize,
        factors: &'a BTreeMap<String, f64>,
    },
}

/// A [`SourceMapping`] checked against a table header
#[derive(Debug)]
struct ResolvedMapping<'a> {
    values: HashMap<Field, ValueSource>,
    units: HashMap<Field, UnitSource<'a>>,
}

/// Find the index of a column, ignoring case and surrounding whitespace
fn find_column(headers: &[String], column: &str) -> Option<usize> {
    let wanted = UniCase::new(column.trim());
    headers
        .iter()
        .position(|header| UniCase::new(header.trim()) == wanted)
}

impl<'a> ResolvedMapping<'a> {
    fn new(mapping: &'a SourceMapping, headers: &[String]) -> Result<Self, String> {
        let mut values = HashMap::new();
        for (field, column) in &mapping.columns {
            let index = find_column(headers, column).ok_or_else(|| {
                format!(
                    "Column '{column}' for field {field} not found in {}",
                    mapping.file.display()
                )
            })?;
            values.insert(*field, ValueSource::Column(index));
        }
        for (field, value) in &mapping.constants {
            if values.contains_key(field) {
                return Err(format!(
                    "Field {field} is given both a column and a constant"
                ));
            }
            let source = match value {
                Literal::Text(text) => ValueSource::Constant(text.clone()),
                Literal::Integer(_) | Literal::Float(_) => ValueSource::Number(value.to_string()),
            };
            values.insert(*field, source);
        }
        if let Some(field) = Field::REQUIRED.iter().find(|f| !values.contains_key(f)) {
            return Err(format!("Required field {field} has no column or constant"));
        }

        let mut units = HashMap::new();
        for (field, conversion) in &mapping.conversions {
            if !field.is_numeric() {
                return Err(format!(
                    "Unit conversions can only be given for numeric fields, not {field}"
                ));
            }
            if !values.contains_key(field) {
                return Err(format!(
                    "Unit conversion given for field {field}, which is not mapped"
                ));
            }
            if let Some((tag, _)) = conversion.factors.iter().find(|(_, f)| !f.is_finite()) {
                return Err(format!(
                    "Conversion factor for unit '{tag}' of field {field} must be finite"
                ));
            }

            let source = match (&conversion.unit, &conversion.unit_column) {
                (Some(unit), None) => {
                    let factor = conversion.factors.get(unit).ok_or_else(|| {
                        format!("No conversion defined for unit '{unit}' of field {field}")
                    })?;
                    UnitSource::Fixed(*factor)
                }
                (None, Some(column)) => {
                    let index = find_column(headers, column).ok_or_else(|| {
                        format!(
                            "Unit column '{column}' for field {field} not found in {}",
                            mapping.file.display()
                        )
                    })?;
                    UnitSource::Column {
                        index,
                        factors: &conversion.factors,
                    }
                }
                _ => {
                    return Err(format!(
                        "Unit conversion for field {field} must give exactly one of unit or \
                        unit_column"
                    ));
                }
            };
            units.insert(*field, source);
        }

        Ok(Self { values, units })
    }
}

/// The outcome of parsing one record
enum ParsedRecord {
    Unit { unit: UnitRecord, corrected: bool },
    Dropped(DropReason),
}

/// Parses a single row of a source table
struct RecordParser<'a> {
    mapping: &'a SourceMapping,
    resolved: &'a ResolvedMapping<'a>,
    row: &'a [String],
    record_no: usize,
}

impl RecordParser<'_> {
    /// The raw text for a field, if present and not blank
    fn text(&self, field: Field) -> Option<&str> {
        let text = match self.resolved.values.get(&field)? {
            ValueSource::Column(index) => self.row.get(*index)?.as_str(),
            ValueSource::Constant(value) | ValueSource::Number(value) => value.as_str(),
        }
        .trim();

        (!text.is_empty()).then_some(text)
    }

    fn required_text(&self, field: Field) -> Result<&str, String> {
        self.text(field)
            .ok_or_else(|| format!("Record {}: missing value for {field}", self.record_no))
    }

    fn invalid(&self, field: Field, text: &str) -> String {
        format!(
            "Record {}: invalid value '{text}' for {field}",
            self.record_no
        )
    }

    /// Parse a numeric field and convert it into canonical units
    fn number(&self, field: Field) -> Result<Option<f64>, String> {
        let Some(text) = self.text(field) else {
            return Ok(None);
        };

        let separator = match self.resolved.values.get(&field) {
            Some(ValueSource::Number(_)) => DecimalSeparator::Point,
            _ => self.mapping.decimal_separator,
        };
        let parsed = match separator {
            DecimalSeparator::Point => f64::from_str(text).ok(),
            DecimalSeparator::Comma if text.contains('.') => None,
            DecimalSeparator::Comma => f64::from_str(&text.replace(',', ".")).ok(),
        };
        let value = parsed
            .filter(|value| value.is_finite())
            .ok_or_else(|| self.invalid(field, text))?;

        Ok(Some(value * self.conversion_factor(field)?))
    }

    fn conversion_factor(&self, field: Field) -> Result<f64, String> {
        match self.resolved.units.get(&field) {
            None => Ok(1.0),
            Some(UnitSource::Fixed(factor)) => Ok(*factor),
            Some(UnitSource::Column { index, factors }) => {
                let tag = self.row.get(*index).map_or("", |tag| tag.trim());
                factors.get(tag).copied().ok_or_else(|| {
                    format!(
                        "Record {}: no conversion defined for unit '{tag}' of field {field}",
                        self.record_no
                    )
                })
            }
        }
    }

    fn year(&self, field: Field) -> Result<Option<u32>, String> {
        self.text(field)
            .map(|text| u32::from_str(text).map_err(|_| self.invalid(field, text)))
            .transpose()
    }

    fn technology(&self) -> Result<Technology, String> {
        let label = self.required_text(Field::Technology)?;
        if let Some(technology) = self.mapping.technology_aliases.get(label) {
            return Ok(*technology);
        }

        Technology::from_str(label).map_err(|_| {
            format!(
                "Record {}: unknown technology '{label}'",
                self.record_no
            )
        })
    }

    fn parse(&self, defaults: &EfficiencyDefaults) -> Result<ParsedRecord, String> {
        let id = UnitID::new(self.required_text(Field::Id)?);
        let technology = self.technology()?;
        let fuel_type = self.required_text(Field::FuelType)?.into();
        let region = self.required_text(Field::Region)?.into();

        let Some(capacity) = self.number(Field::NetCapacityMw)? else {
            return Ok(ParsedRecord::Dropped(DropReason::MissingCapacity));
        };
        if capacity <= 0.0 {
            return Ok(ParsedRecord::Dropped(DropReason::NonPositiveCapacity));
        }

        let Some(commissioning_year) = self.year(Field::CommissioningYear)? else {
            return Ok(ParsedRecord::Dropped(
                DropReason::MissingCommissioningYear,
            ));
        };
        let decommissioning_year = self.year(Field::DecommissioningYear)?;
        if decommissioning_year.is_some_and(|year| year < commissioning_year) {
            return Ok(ParsedRecord::Dropped(
                DropReason::DecommissionedBeforeCommissioning,
            ));
        }

        let mut efficiency = self.number(Field::Efficiency)?;
        if let Some(value) = efficiency
            && !(value > 0.0 && value <= 1.0)
        {
            return Err(format!(
                "Record {}: efficiency {value} is outside (0, 1]",
                self.record_no
            ));
        }
        let mut corrected = false;
        if efficiency.is_none() {
            efficiency = defaults
                .get(technology, commissioning_year)
                .map(Dimensionless::value);
            corrected = efficiency.is_some();
        }

        let min_load_factor = self.number(Field::MinLoadFactor)?;
        if let Some(value) = min_load_factor
            && !(0.0..=1.0).contains(&value)
        {
            return Err(format!(
                "Record {}: minimum load factor {value} is outside [0, 1]",
                self.record_no
            ));
        }
        let load_gradient = self.number(Field::LoadGradient)?;
        if let Some(value) = load_gradient
            && value < 0.0
        {
            return Err(format!(
                "Record {}: load gradient {value} is negative",
                self.record_no
            ));
        }

        let unit = UnitRecord {
            id,
            technology,
            fuel_type,
            region,
            net_capacity_mw: Capacity(capacity),
            efficiency: efficiency.map(Dimensionless),
            commissioning_year,
            decommissioning_year,
            variable_cost: MoneyPerEnergy(self.number(Field::VariableCost)?.unwrap_or(0.0)),
            fixed_cost: MoneyPerCapacityPerYear(self.number(Field::FixedCost)?.unwrap_or(0.0)),
            min_load_factor: min_load_factor.map(Dimensionless),
            // Per hour, as a unit cannot change by more than its capacity
            load_gradient: load_gradient
                .map(|per_minute| Dimensionless((per_minute * MINUTES_PER_HOUR).min(1.0))),
        };

        Ok(ParsedRecord::Unit { unit, corrected })
    }
}
