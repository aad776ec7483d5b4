//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则由 `validator` derive 完成 (query 非空, 至少一个类别/副本, 名称非空)
//! - 类别名称唯一
//! - 同一类别内副本名称唯一
//! - uniform 延迟满足 min_ms <= max_ms

use std::collections::HashSet;

use contracts::{ContractError, DelayProfile, FanInBlueprint};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 FanInBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &FanInBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_category_names(blueprint)?;
    validate_replica_names(blueprint)?;
    validate_delays(blueprint)?;
    Ok(())
}

/// 字段级校验
fn validate_fields(blueprint: &FanInBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| (String::from("<root>"), errors.to_string()));
        ContractError::config_validation(field, message)
    })
}

/// 取出第一个字段错误及其路径 (例如 `categories[1].replicas`)
///
/// HashMap 无序，按字段名排序以保证错误信息稳定。
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by_key(|(field, _)| field.to_string());

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|error| {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_violation(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_violation(inner, &format!("{path}[{idx}]"))),
        };

        if found.is_some() {
            return found;
        }
    }
    None
}

/// 校验类别名称唯一性
fn validate_category_names(blueprint: &FanInBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for category in &blueprint.categories {
        if !seen.insert(category.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("categories[name={}]", category.name),
                "duplicate category name",
            ));
        }
    }
    Ok(())
}

/// 校验副本名称在类别内唯一
fn validate_replica_names(blueprint: &FanInBlueprint) -> Result<(), ContractError> {
    for category in &blueprint.categories {
        let mut seen = HashSet::new();
        for replica in &category.replicas {
            if !seen.insert(replica.name.as_str()) {
                return Err(ContractError::config_validation(
                    format!("categories[{}].replicas[name={}]", category.name, replica.name),
                    "duplicate replica name",
                ));
            }
        }
    }
    Ok(())
}

/// 校验延迟区间
fn validate_delays(blueprint: &FanInBlueprint) -> Result<(), ContractError> {
    for category in &blueprint.categories {
        for replica in &category.replicas {
            if let DelayProfile::Uniform { min_ms, max_ms } = replica.delay {
                if min_ms > max_ms {
                    return Err(ContractError::config_validation(
                        format!("categories[{}].replicas[{}].delay", category.name, replica.name),
                        format!("min_ms ({min_ms}) must be <= max_ms ({max_ms})"),
                    ));
                }
            }
        }
    }
    Ok(())
}
