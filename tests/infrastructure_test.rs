//! Test to verify test infrastructure works correctly

mod common;

use common::builders::ConfigBuilder;
use serialgraph::types::ColumnMode;

#[test]
fn test_infrastructure_setup() {
    let config = ConfigBuilder::new()
        .delimiter(";")
        .columns(4)
        .column_mode(ColumnMode::ElapsedTime)
        .build();

    assert_eq!(config.parsing.delimiter, ";");
    assert_eq!(config.detection.columns, Some(4));
    assert_eq!(config.render.column_mode, ColumnMode::ElapsedTime);
    assert!(!config.log.enabled);
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
