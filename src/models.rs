//! Data models for the recurrence panel.
//!
//! This module contains the transaction ledger the engine reads, the typed
//! result rows every indicator produces, and the report wrapper the
//! renderers consume.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// External column names of the requisition ledger.
///
/// Downstream consumers look columns up by name, so these must stay
/// bit-exact.
pub mod columns {
    pub const SITE: &str = "EMPRD";
    pub const SITE_DESC: &str = "EMPRD_DESC";
    pub const REQUISITION: &str = "REQ_CDG";
    pub const REQUISITION_DATE: &str = "REQ_DATA";
    pub const MATERIAL: &str = "INSUMO_CDG";
    pub const MATERIAL_DESC: &str = "INSUMO_DESC";
    pub const MATERIAL_KIND: &str = "TIPO_MATERIAL";
    pub const ORDERED_QTY: &str = "QTD_PED";
    pub const SUPPLIER_ORDER: &str = "OF_CDG";
    pub const SUPPLIER: &str = "FORNECEDOR_CDG";
}

/// Classification label for commodity materials.
pub const BASIC_LABEL: &str = "BÁSICO";

/// Classification label for project-specialized materials.
pub const SPECIFIC_LABEL: &str = "ESPECÍFICO";

/// One material line within a requisition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Site (obra) code.
    pub site: String,
    pub site_desc: Option<String>,
    /// Requisition code.
    pub requisition: Option<String>,
    /// Requisition timestamp; `None` when the cell could not be parsed.
    pub requisition_date: Option<NaiveDateTime>,
    /// Material code.
    pub material: String,
    pub material_desc: Option<String>,
    /// "BÁSICO" / "ESPECÍFICO" classification as found in the export.
    pub material_kind: Option<String>,
    pub quantity: Option<f64>,
    /// Supplier order (OF) code.
    pub supplier_order: Option<String>,
    pub supplier: Option<String>,
}

impl Transaction {
    /// Creates a line with only the mandatory keys set.
    pub fn new(site: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            site_desc: None,
            requisition: None,
            requisition_date: None,
            material: material.into(),
            material_desc: None,
            material_kind: None,
            quantity: None,
            supplier_order: None,
            supplier: None,
        }
    }

    /// Whether the line is classified as a basic material.
    pub fn is_basic(&self) -> bool {
        self.material_kind
            .as_deref()
            .map(|kind| {
                let kind = kind.trim().to_uppercase();
                kind == BASIC_LABEL || kind == "BASICO"
            })
            .unwrap_or(false)
    }
}

/// Which optional columns were present in the source table.
///
/// Site, material and requisition date are always part of the schema;
/// the engine degrades to empty results when a column it needs is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSchema {
    pub site_desc: bool,
    pub requisition: bool,
    pub material_desc: bool,
    pub material_kind: bool,
    pub quantity: bool,
    pub supplier_order: bool,
    pub supplier: bool,
}

impl LedgerSchema {
    /// A schema with every optional column present.
    pub fn complete() -> Self {
        Self {
            site_desc: true,
            requisition: true,
            material_desc: true,
            material_kind: true,
            quantity: true,
            supplier_order: true,
            supplier: true,
        }
    }
}

/// The immutable transaction table every indicator is computed from.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub records: Vec<Transaction>,
    pub schema: LedgerSchema,
}

impl Ledger {
    pub fn new(records: Vec<Transaction>, schema: LedgerSchema) -> Self {
        Self { records, schema }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A typed indicator row with a fixed, named column set.
///
/// The column list is identical whether or not any row exists, so
/// renderers never need to special-case empty tables.
pub trait IndicatorRow {
    /// Column names in output order.
    const COLUMNS: &'static [&'static str];

    /// Cell values in the same order as [`IndicatorRow::COLUMNS`].
    fn cells(&self) -> Vec<String>;
}

/// Basic materials requisitioned repeatedly within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRecurrence {
    #[serde(rename = "EMPRD")]
    pub site: String,
    #[serde(rename = "EMPRD_DESC")]
    pub site_desc: String,
    /// Calendar month formatted as `YYYY-MM`.
    #[serde(rename = "ANO_MES")]
    pub month: String,
    #[serde(rename = "INSUMO_CDG")]
    pub material: String,
    #[serde(rename = "INSUMO_DESC")]
    pub material_desc: String,
    #[serde(rename = "QTD_REQS_MES")]
    pub requisitions: usize,
}

impl IndicatorRow for MonthlyRecurrence {
    const COLUMNS: &'static [&'static str] = &[
        "EMPRD",
        "EMPRD_DESC",
        "ANO_MES",
        "INSUMO_CDG",
        "INSUMO_DESC",
        "QTD_REQS_MES",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.site.clone(),
            self.site_desc.clone(),
            self.month.clone(),
            self.material.clone(),
            self.material_desc.clone(),
            self.requisitions.to_string(),
        ]
    }
}

/// Basic materials appearing in back-to-back requisitions of a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsequentRequisitions {
    #[serde(rename = "EMPRD")]
    pub site: String,
    #[serde(rename = "EMPRD_DESC")]
    pub site_desc: String,
    #[serde(rename = "INSUMO_CDG")]
    pub material: String,
    #[serde(rename = "INSUMO_DESC")]
    pub material_desc: String,
    /// Requisitions of the site that carried the material.
    #[serde(rename = "TOTAL_REQS_ITEM")]
    pub total_requisitions: usize,
    /// Pairs of consecutive requisitions (n, n+1) both carrying the material.
    #[serde(rename = "N_LIGACOES_SUBSEQ")]
    pub links: usize,
    /// Longest unbroken chain of consecutive requisitions.
    #[serde(rename = "MAX_SEQ_SUBSEQ")]
    pub max_run: usize,
}

impl IndicatorRow for SubsequentRequisitions {
    const COLUMNS: &'static [&'static str] = &[
        "EMPRD",
        "EMPRD_DESC",
        "INSUMO_CDG",
        "INSUMO_DESC",
        "TOTAL_REQS_ITEM",
        "N_LIGACOES_SUBSEQ",
        "MAX_SEQ_SUBSEQ",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.site.clone(),
            self.site_desc.clone(),
            self.material.clone(),
            self.material_desc.clone(),
            self.total_requisitions.to_string(),
            self.links.to_string(),
            self.max_run.to_string(),
        ]
    }
}

/// Basic materials requisitioned in many ISO weeks at the same site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecurrence {
    #[serde(rename = "EMPRD")]
    pub site: String,
    #[serde(rename = "EMPRD_DESC")]
    pub site_desc: String,
    #[serde(rename = "INSUMO_CDG")]
    pub material: String,
    #[serde(rename = "INSUMO_DESC")]
    pub material_desc: String,
    #[serde(rename = "SEMANAS_DISTINTAS")]
    pub distinct_weeks: usize,
    #[serde(rename = "MAX_SEQ_SEMANAS")]
    pub max_run: usize,
}

impl IndicatorRow for WeeklyRecurrence {
    const COLUMNS: &'static [&'static str] = &[
        "EMPRD",
        "EMPRD_DESC",
        "INSUMO_CDG",
        "INSUMO_DESC",
        "SEMANAS_DISTINTAS",
        "MAX_SEQ_SEMANAS",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.site.clone(),
            self.site_desc.clone(),
            self.material.clone(),
            self.material_desc.clone(),
            self.distinct_weeks.to_string(),
            self.max_run.to_string(),
        ]
    }
}

/// Day gaps between consecutive requisitions of a material at a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequisitionInterval {
    #[serde(rename = "EMPRD")]
    pub site: String,
    #[serde(rename = "EMPRD_DESC")]
    pub site_desc: String,
    #[serde(rename = "INSUMO_CDG")]
    pub material: String,
    #[serde(rename = "INSUMO_DESC")]
    pub material_desc: String,
    /// Distinct requisition days.
    #[serde(rename = "TOTAL_REQS_ITEM")]
    pub requisitions: usize,
    /// Mean gap in days, rounded to 2 decimals.
    #[serde(rename = "INTERVALO_MEDIO_DIAS")]
    pub mean_days: f64,
    #[serde(rename = "INTERVALO_MIN_DIAS")]
    pub min_days: i64,
    #[serde(rename = "INTERVALO_MAX_DIAS")]
    pub max_days: i64,
}

impl IndicatorRow for RequisitionInterval {
    const COLUMNS: &'static [&'static str] = &[
        "EMPRD",
        "EMPRD_DESC",
        "INSUMO_CDG",
        "INSUMO_DESC",
        "TOTAL_REQS_ITEM",
        "INTERVALO_MEDIO_DIAS",
        "INTERVALO_MIN_DIAS",
        "INTERVALO_MAX_DIAS",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.site.clone(),
            self.site_desc.clone(),
            self.material.clone(),
            self.material_desc.clone(),
            self.requisitions.to_string(),
            self.mean_days.to_string(),
            self.min_days.to_string(),
            self.max_days.to_string(),
        ]
    }
}

/// A "pingado" material: ordered often, in small average quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowQuantityItem {
    #[serde(rename = "INSUMO_CDG")]
    pub material: String,
    #[serde(rename = "INSUMO_DESC")]
    pub material_desc: String,
    #[serde(rename = "pedidos")]
    pub orders: usize,
    /// Mean ordered quantity, rounded to 3 decimals.
    #[serde(rename = "media_qtd")]
    pub mean_quantity: f64,
    #[serde(rename = "qtd_total")]
    pub total_quantity: f64,
    /// Distinct supplier orders (OF) the material went through.
    #[serde(rename = "vezes_distintas")]
    pub distinct_supplier_orders: usize,
}

impl IndicatorRow for LowQuantityItem {
    const COLUMNS: &'static [&'static str] = &[
        "INSUMO_CDG",
        "INSUMO_DESC",
        "pedidos",
        "media_qtd",
        "qtd_total",
        "vezes_distintas",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.material.clone(),
            self.material_desc.clone(),
            self.orders.to_string(),
            self.mean_quantity.to_string(),
            self.total_quantity.to_string(),
            self.distinct_supplier_orders.to_string(),
        ]
    }
}

/// Count of distinct materials flagged by each indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    #[serde(rename = "ano")]
    pub year: Option<i32>,
    #[serde(rename = "qtd_itens_2plus_reqs_mes")]
    pub monthly: usize,
    #[serde(rename = "qtd_itens_com_reqs_subsequentes")]
    pub subsequent: usize,
    #[serde(rename = "qtd_itens_semanal_obra")]
    pub weekly: usize,
    #[serde(rename = "qtd_itens_com_intervalo_calculado")]
    pub intervals: usize,
    #[serde(rename = "qtd_itens_pequena_qtd_alta_freq")]
    pub low_quantity: usize,
}

impl IndicatorSummary {
    /// Indicator name → distinct material count, in panel order.
    pub fn entries(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("qtd_itens_2plus_reqs_mes", self.monthly),
            ("qtd_itens_com_reqs_subsequentes", self.subsequent),
            ("qtd_itens_semanal_obra", self.weekly),
            ("qtd_itens_com_intervalo_calculado", self.intervals),
            ("qtd_itens_pequena_qtd_alta_freq", self.low_quantity),
        ]
    }
}

/// All five indicator tables for one year plus their summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecurrencePanel {
    #[serde(rename = "basicos_reqs_mes")]
    pub monthly: Vec<MonthlyRecurrence>,
    #[serde(rename = "basicos_reqs_subsequentes")]
    pub subsequent: Vec<SubsequentRequisitions>,
    #[serde(rename = "basicos_semanal_por_obra")]
    pub weekly: Vec<WeeklyRecurrence>,
    #[serde(rename = "intervalo_medio_entre_pedidos")]
    pub intervals: Vec<RequisitionInterval>,
    #[serde(rename = "itens_pequena_qtd_alta_freq")]
    pub low_quantity: Vec<LowQuantityItem>,
    #[serde(rename = "resumo_indicadores")]
    pub summary: IndicatorSummary,
}

/// A material's monthly recurrence summed over months (and sites).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyItemTotal {
    #[serde(rename = "INSUMO_CDG")]
    pub material: String,
    #[serde(rename = "INSUMO_DESC")]
    pub material_desc: String,
    #[serde(rename = "QTD_REQS_MES")]
    pub requisitions: usize,
}

/// Monthly recurrence detail for a single site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDetail {
    pub site: String,
    pub site_desc: String,
    pub items: Vec<MonthlyItemTotal>,
}

/// A site or material code with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLabel {
    pub code: String,
    pub name: String,
}

/// Distinct weeks per (site, material) for the most weekly-recurrent
/// materials and the sites that request them most.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHeatmap {
    /// Rows, highest total first.
    pub sites: Vec<EntityLabel>,
    /// Columns, highest total first.
    pub materials: Vec<EntityLabel>,
    /// `cells[i][j]` holds `SEMANAS_DISTINTAS` of material `j` at site `i`,
    /// 0 where the pair has no weekly row.
    pub cells: Vec<Vec<usize>>,
}

impl WeeklyHeatmap {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty() || self.materials.is_empty()
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Input file or directory the ledger was read from.
    pub input: String,
    /// Target year (`None` = all years).
    pub year: Option<i32>,
    pub generated_at: DateTime<Utc>,
    /// Files read from the input.
    pub files_read: usize,
    /// Rows accepted into the ledger.
    pub rows_loaded: usize,
    /// Rows rejected at ingestion (missing site or material).
    pub rows_rejected: usize,
    /// Rows left after the basic-material/year filter.
    pub basic_rows: usize,
    pub duration_seconds: f64,
}

/// The complete recurrence report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub panel: RecurrencePanel,
    /// Materials with the highest summed monthly recurrence.
    pub top_items: Vec<MonthlyItemTotal>,
    /// Site × material matrix of distinct weeks.
    pub weekly_heatmap: WeeklyHeatmap,
    /// Site/material pairs with the most back-to-back requisitions.
    pub top_subsequent: Vec<SubsequentRequisitions>,
    /// Low-quantity materials with the most orders.
    pub top_low_quantity: Vec<LowQuantityItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_detail: Option<SiteDetail>,
}
