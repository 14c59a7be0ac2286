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

mod compile;
mod deploy;

use anyhow::Result;
use clap::{crate_version, App, AppSettings, Arg};

fn definition_arg() -> Arg<'static> {
    Arg::new("definition")
        .short('f')
        .long("file")
        .value_name("FILE")
        .help("Path to the pipeline declaration")
        .takes_value(true)
        .required(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("Pipewright")
        .version(crate_version!())
        .about("Command Line Controller for Pipewright")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            App::new("compile")
                .about("Renders a pipeline declaration into its workflow document")
                .arg(definition_arg())
                .arg(
                    Arg::new("workflows")
                        .short('w')
                        .long("workflows")
                        .value_name("FILE")
                        .help(
                            "JSON map of deployed workflow names to addresses, \
                             used to resolve cross-pipeline references offline",
                        )
                        .takes_value(true),
                ),
        )
        .subcommand(
            App::new("deploy")
                .about("Deploys a pipeline: functions, workflow, trigger")
                .arg(definition_arg()),
        )
        .subcommand(
            App::new("destroy")
                .about("Tears a deployed pipeline down")
                .arg(definition_arg()),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("compile", sub_matches)) => compile::run(sub_matches).await,
        Some(("deploy", sub_matches)) => deploy::deploy(sub_matches).await,
        Some(("destroy", sub_matches)) => deploy::destroy(sub_matches).await,
        _ => unreachable!(),
    }
}
