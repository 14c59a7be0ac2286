// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Renders a pipeline declaration into its workflow document without
//! touching AWS. Function addresses are placeholders; cross-pipeline
//! references resolve against an optional workflow table supplied on the
//! command line.

use anyhow::{Context, Result};
use clap::ArgMatches;
use pipewright::prelude::*;
use std::collections::HashMap;
use std::fs;

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .value_of("definition")
        .expect("definition file is required");
    let declaration =
        fs::read_to_string(path).with_context(|| format!("reading declaration {}", path))?;
    let definition = PipelineDefinition::from_json(path, &declaration)?;

    let addresses: DeployedFunctionMap = definition
        .functions
        .iter()
        .map(|function| {
            (
                function.name.clone(),
                format!("arn:aws:lambda:::function:{}", function.name),
            )
        })
        .collect();

    let workflows: HashMap<String, String> = match matches.value_of("workflows") {
        Some(table) => serde_json::from_str(
            &fs::read_to_string(table).with_context(|| format!("reading workflows {}", table))?,
        )?,
        None => HashMap::new(),
    };

    let document = compile(&definition, &addresses, &StaticLookup::new(workflows)).await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
