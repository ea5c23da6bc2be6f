//! risk-runner: headless front end for the risk quantification core.
//!
//! Reads one JSON command per line on stdin and answers with one JSON
//! line on stdout. Bad input gets an `{"error": ...}` reply and the loop
//! carries on.
//!
//! Usage:
//!   risk-runner --seed 12345
//!   risk-runner --seed 12345 --config data/risk_quant.json --db runs.db
//!
//! Example commands:
//!   {"type":"score_control","control":{"controlType":"PREVENTIVE",...}}
//!   {"type":"residual","probability":5,"impact":4,"controls":[...]}
//!   {"type":"simulate","request":{"impactMin":1,"impactMode":3,...}}

mod store;

use anyhow::{Context, Result};
use riskquant_core::{
    config::QuantConfig,
    control::{ControlAttributes, RawControlAttributes, RiskControl},
    control_scoring::score_control,
    register::{critical_risks, summarize, HeatMap, RiskAssessment, Stage},
    residual::ResidualRiskCalculator,
    risk_matrix::RiskMatrix,
    rng::RngBank,
    simulation::{worker::spawn_simulation, MonteCarloSimulator, SimulationRequest},
    types::GridPosition,
};
use serde_json::json;
use std::env;
use std::io::{self, BufRead, Write};
use store::{NewRun, RunStore};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    ScoreControl {
        control: RawControlAttributes,
    },
    Residual {
        probability: i64,
        impact: i64,
        #[serde(default)]
        controls: Vec<RawControlAttributes>,
        #[serde(default)]
        scheme: Option<String>,
    },
    Simulate {
        #[serde(default)]
        risk_id: Option<String>,
        request: serde_json::Value,
    },
    Heatmap {
        #[serde(default)]
        stage: Stage,
        risks: Vec<RiskInput>,
    },
    CriticalRisks {
        #[serde(default)]
        stage: Stage,
        scheme: String,
        risks: Vec<RiskInput>,
    },
    Summary {
        scheme: String,
        risks: Vec<RiskInput>,
    },
    ListRuns {
        #[serde(default = "default_list_limit")]
        limit: u32,
    },
    Quit,
}

fn default_list_limit() -> u32 {
    20
}

/// A register entry as the risk-assessment collaborator sends it.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RiskInput {
    id: String,
    #[serde(default)]
    name: String,
    probability: i64,
    impact: i64,
    #[serde(default)]
    controls: Vec<RawControlAttributes>,
}

struct Runner {
    config: QuantConfig,
    calculator: ResidualRiskCalculator,
    matrix: RiskMatrix,
    simulator: MonteCarloSimulator,
    bank: RngBank,
    next_run: u64,
    store: Option<RunStore>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let config_path = string_arg(&args, "--config");
    let db = string_arg(&args, "--db");

    let config = match config_path {
        Some(path) => QuantConfig::load(path).with_context(|| format!("loading config {path}"))?,
        None => QuantConfig::standard(),
    };

    let store = match db {
        Some(path) => {
            let store = RunStore::open(path)?;
            store.migrate()?;
            Some(store)
        }
        None => None,
    };

    log::info!(
        "risk-runner: seed={seed} config={} db={} policy={:?}",
        config_path.unwrap_or("<built-in>"),
        db.unwrap_or("<none>"),
        config.residual_policy
    );

    let mut runner = Runner::new(config, seed, store)?;
    runner.run_loop()
}

impl Runner {
    fn new(config: QuantConfig, seed: u64, store: Option<RunStore>) -> Result<Self> {
        let matrix = RiskMatrix::from_config(&config.risk_matrix)?;
        let simulator = MonteCarloSimulator::new(config.simulation.clone()).with_matrix(matrix.clone());
        Ok(Self {
            calculator: ResidualRiskCalculator::new(config.residual_policy),
            matrix,
            simulator,
            bank: RngBank::new(seed),
            next_run: 0,
            store,
            config,
        })
    }

    fn run_loop(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let mut handle = stdin.lock();
        let mut buffer = String::new();

        loop {
            buffer.clear();
            let bytes_read = handle.read_line(&mut buffer)?;
            if bytes_read == 0 {
                break; // EOF
            }
            if buffer.trim().is_empty() {
                continue;
            }

            match self.respond(&buffer) {
                Some(reply) => writeln!(stdout, "{reply}")?,
                None => break,
            }
            stdout.flush()?;
        }
        Ok(())
    }

    /// The reply line for one input line. Failures become `{"error": ...}`
    /// replies; `None` means quit.
    fn respond(&mut self, line: &str) -> Option<serde_json::Value> {
        let cmd: IpcCommand = match serde_json::from_str(line) {
            Ok(c) => c,
            Err(e) => return Some(json!({ "error": e.to_string() })),
        };

        match self.handle(cmd) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("risk-runner: command failed: {e:#}");
                Some(json!({ "error": format!("{e:#}") }))
            }
        }
    }

    /// `None` means quit.
    fn handle(&mut self, cmd: IpcCommand) -> Result<Option<serde_json::Value>> {
        let reply = match cmd {
            IpcCommand::Quit => return Ok(None),
            IpcCommand::ScoreControl { control } => {
                let attributes = ControlAttributes::try_from(&control)?;
                serde_json::to_value(score_control(&attributes))?
            }
            IpcCommand::Residual {
                probability,
                impact,
                controls,
                scheme,
            } => self.residual(probability, impact, &controls, scheme.as_deref())?,
            IpcCommand::Simulate { risk_id, request } => self.simulate(risk_id.as_deref(), request)?,
            IpcCommand::Heatmap { stage, risks } => {
                let register = self.build_register(&risks)?;
                serde_json::to_value(HeatMap::build(&register, stage))?
            }
            IpcCommand::CriticalRisks {
                stage,
                scheme,
                risks,
            } => {
                let register = self.build_register(&risks)?;
                let critical = critical_risks(&register, stage, self.matrix.scheme(&scheme)?);
                json!({ "count": critical.len(), "risks": critical })
            }
            IpcCommand::Summary { scheme, risks } => {
                let register = self.build_register(&risks)?;
                serde_json::to_value(summarize(&register, self.matrix.scheme(&scheme)?))?
            }
            IpcCommand::ListRuns { limit } => match &self.store {
                Some(store) => json!({ "runs": store.recent_runs(limit)? }),
                None => anyhow::bail!("no run archive configured (start with --db)"),
            },
        };
        Ok(Some(reply))
    }

    fn residual(
        &self,
        probability: i64,
        impact: i64,
        controls: &[RawControlAttributes],
        scheme: Option<&str>,
    ) -> Result<serde_json::Value> {
        let inherent = GridPosition::from_raw(probability, impact)?;
        let controls = controls
            .iter()
            .map(RiskControl::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        let residual = self.calculator.calculate(inherent, &controls)?;

        let mut reply = json!({
            "inherent": { "probability": inherent.probability, "impact": inherent.impact, "score": inherent.score() },
            "residual": residual,
            "controls": controls,
        });
        if let Some(scheme) = scheme {
            reply["inherentLevel"] = serde_json::to_value(self.matrix.classify_position(scheme, inherent)?)?;
            reply["residualLevel"] =
                serde_json::to_value(self.matrix.classify_position(scheme, residual.position())?)?;
        }
        Ok(reply)
    }

    fn simulate(&mut self, risk_id: Option<&str>, mut raw: serde_json::Value) -> Result<serde_json::Value> {
        if let Some(obj) = raw.as_object_mut() {
            obj.entry("iterations")
                .or_insert_with(|| json!(self.config.simulation.default_iterations));
        }
        let request: SimulationRequest = serde_json::from_value(raw)?;

        let run_index = self.next_run;
        self.next_run += 1;

        let handle = spawn_simulation(self.simulator.clone(), request.clone(), self.bank.for_run(run_index))?;
        let result = handle.join()?;

        let run_id = match &self.store {
            Some(store) => Some(store.insert_run(&NewRun {
                risk_id,
                seed: self.bank.master_seed(),
                run_index,
                request: &request,
                result: &result,
            })?),
            None => None,
        };

        Ok(json!({
            "runId": run_id,
            "runIndex": run_index,
            "riskId": risk_id,
            "simulation": result,
        }))
    }

    fn build_register(&self, risks: &[RiskInput]) -> Result<Vec<RiskAssessment>> {
        risks
            .iter()
            .map(|r| {
                let inherent = GridPosition::from_raw(r.probability, r.impact)
                    .with_context(|| format!("risk {}", r.id))?;
                let controls = r
                    .controls
                    .iter()
                    .map(RiskControl::from_raw)
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("risk {}", r.id))?;
                Ok(RiskAssessment::with_controls(
                    r.id.clone(),
                    r.name.clone(),
                    inherent,
                    controls,
                    &self.calculator,
                )?)
            })
            .collect()
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
