/// Utilitários para manipulação segura de strings UTF-8

/// Trunca uma string sem cortar um caractere UTF-8 no meio
///
/// # Exemplo
/// ```
/// use qbo_auth_middleware::utils::string_utils::truncate_safe;
///
/// let text = "Olá, mundo! 🌍";
/// assert_eq!(truncate_safe(text, 10), "Olá, mund");
/// ```
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Versão para logs de tokens, codes e ids de sessão: só o prefixo aparece
///
/// Valores curtos demais são totalmente mascarados.
pub fn redact(secret: &str) -> String {
    const VISIBLE: usize = 8;

    if secret.len() <= VISIBLE * 2 {
        return "***".to_string();
    }

    format!("{}...", truncate_safe(secret, VISIBLE))
}
