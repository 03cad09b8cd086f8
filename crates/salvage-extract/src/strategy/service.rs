// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document service — hands the file to an external conversion tool and
// reads plain text back from its stdout.

use salvage_core::config::ServiceCommand;
use salvage_core::types::{FailureReason, StrategyKind, UnitOutcome};
use tracing::{info, instrument};

use super::{AdapterContext, StrategyAdapter, single_unit};
use crate::source::SourceDocument;
use crate::tool;

#[derive(Debug, Clone)]
pub struct DocumentServiceAdapter {
    command: ServiceCommand,
}

impl DocumentServiceAdapter {
    pub fn new(command: ServiceCommand) -> Self {
        Self { command }
    }
}

impl StrategyAdapter for DocumentServiceAdapter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DocumentService
    }

    #[instrument(skip_all, fields(program = %self.command.program))]
    fn extract(
        &self,
        document: &SourceDocument,
        ctx: &AdapterContext,
    ) -> Result<Vec<UnitOutcome>, FailureReason> {
        let input = document.materialize(&ctx.work_dir)?;
        let mut args: Vec<std::ffi::OsString> =
            self.command.args.iter().map(Into::into).collect();
        args.push(input.into_os_string());

        let stdout = tool::run(&self.command.program, args, None)?;
        let text = String::from_utf8_lossy(&stdout).into_owned();
        info!(chars = text.len(), "Document service returned text");
        single_unit(text)
    }
}
