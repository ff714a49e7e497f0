use std::{fmt, str::FromStr, time::Duration};

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};

use crate::models::Observation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "pt" | "pt-br" | "portuguese" => Ok(Language::Pt),
            other => bail!("unsupported language '{other}'"),
        }
    }
}

/// `52` for whole numbers, `52.5` otherwise; `?` when unknown.
struct Pct(Option<f64>);

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) if value.fract() == 0.0 => write!(f, "{value:.0}%"),
            Some(value) => write!(f, "{value:.1}%"),
            None => f.write_str("?"),
        }
    }
}

fn percent_lines(obs: &Observation, language: Language) -> String {
    let (player, banker, tie) = match language {
        Language::En => ("Player", "Banker", "Tie"),
        Language::Pt => ("Jogador", "Banca", "Empate"),
    };
    format!(
        "👤 {player}: {}\n🏦 {banker}: {}\n🤝 {tie}: {}",
        Pct(obs.player_pct),
        Pct(obs.banker_pct),
        Pct(obs.tie_pct)
    )
}

/// Sent on every cycle that meets the alert condition.
pub fn entry_alert(obs: &Observation, language: Language) -> String {
    let header = match language {
        Language::En => "CONFIRMED ENTRY\n🎲 ENTER THE COLOR (🔴)\n🎯 PROTECT ON TIE (🟢)",
        Language::Pt => "ENTRADA CONFIRMADA\n🎲 ENTRAR NA COR (🔴)\n🎯 PROTEGER NO EMPATE (🟢)",
    };
    let footer = match language {
        Language::En => "💰💰🤖 Enter The Game",
        Language::Pt => "💰💰🤖 Entrar No Jogo",
    };
    format!("{header}\n\n{}\n\n{footer}", percent_lines(obs, language))
}

pub fn status_update(obs: &Observation, threshold: f64, language: Language) -> String {
    let alerting = obs.player_above(threshold);
    let (title, verdict) = match (language, alerting) {
        (Language::En, true) => ("📊 Current Status", "✅ Alert condition met!"),
        (Language::En, false) => ("📊 Current Status", "⏳ Waiting for favorable condition..."),
        (Language::Pt, true) => ("📊 Status Atual", "✅ Condição de alerta ativada!"),
        (Language::Pt, false) => ("📊 Status Atual", "⏳ Aguardando condição favorável..."),
    };
    format!("{title}\n\n{}\n\n{verdict}", percent_lines(obs, language))
}

/// Status message for a cycle where no percentage could be read.
pub fn statistics_unavailable(language: Language) -> String {
    match language {
        Language::En => "⚠️ Could not retrieve game statistics.\n\n\
            Possible causes:\n\
            • Site may be blocking automated access\n\
            • Page may not be loading completely\n\
            • Game content may be in an undetected iframe\n\n\
            Monitoring continues..."
            .into(),
        Language::Pt => "⚠️ Não foi possível obter estatísticas do jogo.\n\n\
            Possíveis causas:\n\
            • Site pode estar bloqueando acesso automatizado\n\
            • Página pode não estar carregando completamente\n\
            • Conteúdo do jogo pode estar em iframe não detectado\n\n\
            O monitoramento continua..."
            .into(),
    }
}

pub fn monitoring_started(interval: Duration, threshold: f64, language: Language) -> String {
    let secs = interval.as_secs_f64();
    let threshold = Pct(Some(threshold));
    match language {
        Language::En => format!(
            "🤖 Bac Bo monitor started!\n\n📊 Monitoring game...\n⏱️ Check interval: {secs} seconds\n🎯 Alert threshold: Player > {threshold}"
        ),
        Language::Pt => format!(
            "🤖 Monitor Bac Bo iniciado!\n\n📊 Monitorando o jogo...\n⏱️ Intervalo de verificação: {secs} segundos\n🎯 Limite de alerta: Jogador > {threshold}"
        ),
    }
}

pub fn monitoring_stopped(language: Language) -> String {
    match language {
        Language::En => "🛑 Bac Bo monitor stopped!\n\nMonitoring has been shut down.".into(),
        Language::Pt => "🛑 Monitor Bac Bo finalizado!\n\nO monitoramento foi encerrado.".into(),
    }
}
