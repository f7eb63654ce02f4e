//! Application-level configuration loading, including the built-in default quiz.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::{Question, Quiz};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUICK_QUIZ_BACK_CONFIG_PATH";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_quiz: Quiz,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in quiz.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => match AppConfig::try_from(raw) {
                    Ok(app_config) => {
                        info!(
                            path = %path.display(),
                            questions = app_config.default_quiz.questions.len(),
                            "loaded default quiz from config"
                        );
                        app_config
                    }
                    Err(reason) => {
                        warn!(
                            path = %path.display(),
                            reason,
                            "config default quiz is malformed; falling back to defaults"
                        );
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Quiz used when a room is created without one in the request body.
    pub fn default_quiz(&self) -> &Quiz {
        &self.default_quiz
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_quiz: built_in_quiz(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_quiz: RawQuiz,
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configured quiz.
struct RawQuiz {
    title: String,
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of a single question inside the configuration file.
struct RawQuestion {
    text: String,
    options: Vec<String>,
    correct_index: usize,
    time_limit_sec: u32,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = &'static str;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        if value.default_quiz.questions.is_empty() {
            return Err("quiz has no questions");
        }
        for question in &value.default_quiz.questions {
            if question.options.len() < 2 {
                return Err("question needs at least two options");
            }
            if question.correct_index >= question.options.len() {
                return Err("correct index is out of range");
            }
            if question.time_limit_sec == 0 {
                return Err("time limit must be at least one second");
            }
        }

        Ok(Self {
            default_quiz: Quiz {
                title: value.default_quiz.title,
                questions: value
                    .default_quiz
                    .questions
                    .into_iter()
                    .map(|question| Question {
                        text: question.text,
                        options: question.options,
                        correct_index: question.correct_index,
                        time_limit_sec: question.time_limit_sec,
                    })
                    .collect(),
            },
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in quiz shipped with the binary.
fn built_in_quiz() -> Quiz {
    let question = |text: &str, options: [&str; 4], correct_index: usize, time_limit_sec: u32| {
        Question {
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_index,
            time_limit_sec,
        }
    };

    Quiz {
        title: "Modelo agroexportador (AR, 1870-1930)".into(),
        questions: vec![
            question(
                "¿En qué período histórico se consolidó el modelo agroexportador?",
                ["1870-1930", "1810-1850", "1940-1970", "1820-1910"],
                0,
                20,
            ),
            question(
                "¿Qué producto se convirtió en el principal de exportación de Argentina?",
                ["Oro", "Carne y cereales", "Vino", "Azúcar"],
                1,
                20,
            ),
            question(
                "¿Qué país fue el principal inversor extranjero en Argentina durante este modelo?",
                ["Francia", "Alemania", "Estados Unidos", "Gran Bretaña"],
                3,
                20,
            ),
            question(
                "¿Qué región argentina fue la más favorecida?",
                ["Noroeste", "Noreste", "Pampa Húmeda", "La Patagonia"],
                2,
                15,
            ),
            question(
                "¿Qué acontecimiento internacional puso en crisis el modelo agroexportador?",
                [
                    "La Segunda Guerra Mundial",
                    "La crisis de 1930",
                    "La Primera Guerra Mundial",
                    "La Revolución Industrial",
                ],
                1,
                20,
            ),
            question(
                "¿Qué grupo social concentraba la tierra y el poder político en Argentina?",
                [
                    "Oligarquía terrateniente",
                    "Clase obrera",
                    "Campesinos indígenas",
                    "Inmigrantes y trabajadores urbanos",
                ],
                0,
                20,
            ),
            question(
                "¿Cuál fue una consecuencia problemática del modelo (1870-1930)?",
                [
                    "Acceso generalizado",
                    "Igual distribución",
                    "Diversificación nacional",
                    "Concentración y desplazamiento",
                ],
                3,
                25,
            ),
            question(
                "¿Qué producto caracterizó la economía cubana?",
                ["Tabaco", "Café", "Azúcar", "Salitre"],
                2,
                20,
            ),
            question(
                "¿Qué país se especializó en café?",
                ["Cuba", "Brasil", "Chile", "Argentina"],
                1,
                20,
            ),
            question(
                "¿Consecuencia ambiental en Argentina?",
                [
                    "Reforestación masiva",
                    "Sobreexplotación y deforestación",
                    "Reducción del monocultivo",
                    "Se detuvo la concentración",
                ],
                1,
                20,
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_quiz_is_well_formed() {
        let quiz = built_in_quiz();
        assert_eq!(quiz.questions.len(), 10);
        for question in &quiz.questions {
            assert!(question.correct_index < question.options.len());
            assert!(question.time_limit_sec > 0);
        }
    }

    #[test]
    fn raw_config_with_bad_index_is_rejected() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "default_quiz": {
                    "title": "t",
                    "questions": [
                        {"text": "q", "options": ["a", "b"], "correctIndex": 2, "timeLimitSec": 10}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert!(AppConfig::try_from(raw).is_err());
    }
}
