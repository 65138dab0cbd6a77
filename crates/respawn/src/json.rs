use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonParseError {
    pub at: String,
    pub message: String,
}

pub fn parse_json<T>(raw: &str) -> Result<T, JsonParseError>
where
    T: DeserializeOwned,
{
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(value) => Ok(value),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            let at = if path.is_empty() { ".".to_string() } else { path };
            Err(JsonParseError {
                at,
                message: source.to_string(),
            })
        }
    }
}
