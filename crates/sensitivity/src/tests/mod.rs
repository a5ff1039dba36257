//! End-to-end tests: sweep file on disk to written report
