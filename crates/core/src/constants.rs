/// Quantity at or below which a position counts as flat, unless overridden by
/// `CalculatorConfig::flat_quantity_threshold`.
pub const FLAT_QUANTITY_THRESHOLD: &str = "0";

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Decimal precision for average cost display
pub const AVERAGE_COST_DISPLAY_PRECISION: u32 = 4;
