//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Returns the GraphQL name of the `T` scalar.
fn name_of<T, S>() -> String
where
    T: GraphQLType<S, TypeInfo = ()>,
    S: ScalarValue,
{
    T::name(&()).map_or_else(|| "<unnamed>".to_owned(), ToOwned::to_owned)
}

/// Parses the target type out of the provided string [`InputValue`] via the
/// [`FromStr`] impl of `As` type.
fn parse_via<As, T, S>(input: &InputValue<S>) -> Result<T, String>
where
    As: FromStr,
    As::Err: fmt::Display,
    T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
    T::Error: fmt::Display,
    S: ScalarValue,
{
    let s = input.as_string_value().ok_or_else(|| {
        format!(
            "Cannot parse input scalar `{}`: expected string input value, \
             found: {input}",
            name_of::<T, S>(),
        )
    })?;
    s.parse::<As>()
        .map_err(|e| {
            format!("Cannot parse input scalar `{}`: {e}", name_of::<T, S>())
        })?
        .try_into()
        .map_err(|e| {
            format!("Cannot parse input scalar `{}`: {e}", name_of::<T, S>())
        })
}

/// Helper type to use in `#[graphql(with = ..)]` attribute.
///
/// Uses [`FromStr`]/[`Display`] impls of `As` type to convert the target type
/// to/from GraphQL scalar.
///
/// Target type must implement [`TryFrom`] and [`AsRef`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Convert the target type into scalar [`Value`] by using [`Display`] impl
    /// of `As` type.
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        parse_via::<As, T, S>(input)
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

/// Helper type to use in `#[graphql(with = ..)]` attribute for write-only
/// scalars.
///
/// Parses the target type like [`Via`] does, but never renders its value
/// back, outputting [`Secret::MASK`] instead.
#[derive(Debug)]
pub struct Secret<As>(PhantomData<As>);

impl<As> Secret<As> {
    /// Placeholder rendered instead of the actual value.
    pub const MASK: &'static str = "***";

    /// Renders the [`Secret::MASK`] regardless of the provided `value`.
    pub fn to_output<T, S>(_: &T) -> Value<S>
    where
        S: ScalarValue,
    {
        Value::from(Self::MASK.to_owned())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// Same as [`Via::from_input()`], but never echoes the rejected input.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        if input.as_string_value().is_none() {
            return Err(format!(
                "Cannot parse input scalar `{}`: expected string input value",
                name_of::<T, S>(),
            ));
        }
        parse_via::<As, T, S>(input)
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue, Value};

    use crate::api::user;

    use super::{Secret, Via};

    type Input = InputValue<DefaultScalarValue>;

    #[test]
    fn parses_valid_string_input() {
        let email: user::Email = Via::<service::domain::user::Email>::from_input(
            &Input::scalar("a@x.com".to_owned()),
        )
        .unwrap();

        assert_eq!(email.to_string(), "a@x.com");
        assert_eq!(
            Via::<service::domain::user::Email>::to_output::<
                _,
                DefaultScalarValue,
            >(&email),
            Value::scalar("a@x.com".to_owned()),
        );
    }

    #[test]
    fn names_scalar_in_parse_errors() {
        let err = Via::<service::domain::user::Email>::from_input::<
            user::Email,
            _,
        >(&Input::scalar("not-an-email".to_owned()))
        .unwrap_err();

        assert!(err.contains("`UserEmail`"), "{err}");
    }

    #[test]
    fn never_renders_secret() {
        let password: user::Password =
            Secret::<service::domain::user::Password>::from_input(
                &Input::scalar("hunter2".to_owned()),
            )
            .unwrap();

        let out = Secret::<service::domain::user::Password>::to_output::<
            _,
            DefaultScalarValue,
        >(&password);

        assert_eq!(out, Value::scalar("***".to_owned()));
    }

    #[test]
    fn rejects_non_string_secret() {
        let err = Secret::<service::domain::user::Password>::from_input::<
            user::Password,
            _,
        >(&Input::scalar(42))
        .unwrap_err();

        assert!(!err.contains("42"), "{err}");
    }
}
