#![deny(unsafe_code)]

pub mod diff;
pub mod env;
pub mod measure;
pub mod opts;
pub mod pod;
pub mod report;
pub mod sample_app;
pub mod util;
pub mod xcode;

use std::ffi::OsStr;

trait DuctExpressionExt {
    fn vars(self, vars: impl IntoIterator<Item = (impl AsRef<OsStr>, impl AsRef<OsStr>)>) -> Self;
}

impl DuctExpressionExt for duct::Expression {
    fn vars(
        mut self,
        vars: impl IntoIterator<Item = (impl AsRef<OsStr>, impl AsRef<OsStr>)>,
    ) -> Self {
        for (k, v) in vars {
            self = self.env(&k, &v);
        }
        self
    }
}
