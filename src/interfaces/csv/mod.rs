pub mod pending_report;
