//! Plain-language key findings, one group per period transition.

use serde::Serialize;

use tariffscope_core::{
    Aggregation, BalanceScope, Flow, Metric, Partner, Period, PeriodBoundaries,
};

/// Findings for one adjacent period pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFinding {
    pub from: Period,
    pub to: Period,
    pub heading: String,
    pub statements: Vec<String>,
}

fn event_name(to: Period) -> &'static str {
    match to {
        Period::TrumpTariff => "Trump tariff onset",
        Period::PostTariff => "End of the Trump tariffs",
        Period::Universal2025Tariff => "2025 universal tariff onset",
        Period::Post2025Agreement => "2025 US-China agreement",
        Period::PreTariff => "Pre-tariff baseline",
    }
}

fn flow_subject(partner: Partner, flow: Flow) -> String {
    match flow {
        Flow::Export => format!("Colombian exports to {partner}"),
        Flow::Import => format!("Colombian imports from {partner}"),
    }
}

fn flow_statement(partner: Partner, flow: Flow, change: &Metric) -> String {
    let subject = flow_subject(partner, flow);
    match change {
        Metric::Defined(v) if *v > 0.0 => format!("{subject} rose by {v:.1}%"),
        Metric::Defined(v) if *v < 0.0 => format!("{subject} fell by {:.1}%", v.abs()),
        Metric::Defined(_) => format!("{subject} were unchanged"),
        Metric::Undefined(reason) => format!("{subject}: change not available ({reason})"),
    }
}

fn balance_statement(scope: BalanceScope, change: &Metric) -> String {
    match change {
        Metric::Defined(v) if *v > 0.0 => format!("{scope} improved by {v:.1}%"),
        Metric::Defined(v) if *v < 0.0 => format!("{scope} worsened by {:.1}%", v.abs()),
        Metric::Defined(_) => format!("{scope} was unchanged"),
        Metric::Undefined(reason) => format!("{scope}: change not available ({reason})"),
    }
}

/// Observations that compare flows within one transition.
fn observations(agg: &Aggregation, from: Period, to: Period) -> Vec<String> {
    let change = |partner, flow| {
        agg.transition(from, partner, flow)
            .and_then(|t| t.change.value())
    };
    let mut out = Vec::new();
    match to {
        Period::TrumpTariff | Period::Universal2025Tariff => {
            if let (Some(us), Some(cn)) = (
                change(Partner::Usa, Flow::Export),
                change(Partner::China, Flow::Export),
            ) {
                if cn > 0.0 && us < cn {
                    out.push(format!(
                        "Exports to China grew faster than exports to the USA ({cn:+.1}% vs {us:+.1}%), \
                         consistent with trade diversion"
                    ));
                }
            }
        }
        Period::PostTariff => {
            if let Some(us) = change(Partner::Usa, Flow::Export) {
                let trend = if us > 0.0 { "recovery" } else { "continued decline" };
                out.push(format!("Colombia-USA exports showed signs of {trend}"));
            }
        }
        Period::PreTariff | Period::Post2025Agreement => {}
    }
    out
}

/// Key findings for every transition in `agg`, in chronological order.
pub fn key_findings(agg: &Aggregation, boundaries: &PeriodBoundaries) -> Vec<KeyFinding> {
    agg.transition_pairs()
        .into_iter()
        .map(|(from, to)| {
            let heading = match to.start(boundaries) {
                Some(date) => format!("{} ({date})", event_name(to)),
                None => event_name(to).to_string(),
            };

            let mut statements: Vec<String> = agg
                .transitions
                .iter()
                .filter(|t| t.from == from)
                .map(|t| flow_statement(t.partner, t.flow, &t.change))
                .collect();
            statements.extend(
                agg.balance_transitions
                    .iter()
                    .filter(|t| t.from == from)
                    .map(|t| balance_statement(t.scope, &t.change)),
            );
            statements.extend(observations(agg, from, to));

            KeyFinding {
                from,
                to,
                heading,
                statements,
            }
        })
        .collect()
}
