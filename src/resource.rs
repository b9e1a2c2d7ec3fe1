use axum::{
    Json, Router,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::RequestContext,
    error::{ActionError, AppError, Notice},
    repository::{Collection, DataClient, DataState, Query, Row, fetch_all, fetch_by_id},
};

/// The mutations a resource page performs, plus the initial fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Action {
    fn past(&self) -> &'static str {
        match self {
            Action::Fetch => "fetched",
            Action::Create => "created",
            Action::Update => "updated",
            Action::Delete => "deleted",
        }
    }

    fn gerund(&self) -> &'static str {
        match self {
            Action::Fetch => "fetching",
            Action::Create => "creating",
            Action::Update => "updating",
            Action::Delete => "deleting",
        }
    }
}

/// Resource
///
/// One administrable collection: where it lives, how its list is ordered, who may
/// change it and how form payloads become rows. Every resource page (events, posts,
/// partnerships, projects) is these generic operations applied to one implementor.
pub trait Resource: Send + Sync + 'static {
    type Record: Serialize + DeserializeOwned + Send + 'static;
    type CreateForm: DeserializeOwned + Validate + Send + 'static;
    type UpdateForm: DeserializeOwned + Validate + Send + 'static;

    const COLLECTION: Collection;
    /// Lowercase noun used in notices ("event").
    const LABEL: &'static str;
    /// Capitalized noun used in notices ("Event").
    const TITLE: &'static str;
    /// Mount point of the list route; items live under `{PATH}/{id}`.
    const PATH: &'static str;

    /// The fixed ordering of the list view.
    fn order() -> Query;

    fn can_view(ctx: &RequestContext) -> bool {
        ctx.is_admin
    }

    fn can_create(ctx: &RequestContext) -> bool {
        ctx.is_admin
    }

    fn can_modify(ctx: &RequestContext, _record: &Self::Record) -> bool {
        ctx.is_admin
    }

    /// Builds the row to insert, stamping the creator or owner from `ctx`.
    fn insert_row(form: Self::CreateForm, ctx: &RequestContext) -> Result<Row, AppError>;

    fn update_row(form: Self::UpdateForm) -> Result<Row, AppError>;

    fn success_title(action: Action) -> String {
        format!("{} {} successfully", Self::TITLE, action.past())
    }

    fn failure_title(action: Action) -> String {
        format!("Error {} {}", action.gerund(), Self::LABEL)
    }
}

/// The response to every successful mutation: the notice to show, and the list as
/// the server now holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome<T> {
    pub notice: Notice,
    pub records: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

fn failed<R: Resource>(action: Action) -> impl FnOnce(AppError) -> ActionError {
    move |error| error.during(R::failure_title(action))
}

async fn refetch<R: Resource>(client: &dyn DataClient) -> Result<Vec<R::Record>, AppError> {
    Ok(fetch_all(client, R::COLLECTION, &R::order()).await?)
}

async fn outcome<R: Resource>(
    client: &dyn DataClient,
    action: Action,
) -> Result<MutationOutcome<R::Record>, ActionError> {
    let records = refetch::<R>(client).await.map_err(failed::<R>(action))?;
    Ok(MutationOutcome {
        notice: Notice::success(R::success_title(action)),
        records,
    })
}

/// Loads the record and checks the caller may change it.
async fn authorize<R: Resource>(
    client: &dyn DataClient,
    ctx: &RequestContext,
    id: Uuid,
) -> Result<R::Record, AppError> {
    let record = fetch_by_id::<R::Record>(client, R::COLLECTION, id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !R::can_modify(ctx, &record) {
        return Err(AppError::Forbidden);
    }
    Ok(record)
}

// --- Operations ---

pub async fn list<R: Resource>(
    client: &dyn DataClient,
    ctx: &RequestContext,
) -> Result<Vec<R::Record>, ActionError> {
    if !R::can_view(ctx) {
        return Err(AppError::Forbidden.during(R::failure_title(Action::Fetch)));
    }
    refetch::<R>(client)
        .await
        .map_err(failed::<R>(Action::Fetch))
}

/// create
///
/// Validates, inserts one row, then re-fetches the whole list. Validation runs
/// before any data-client call.
pub async fn create<R: Resource>(
    client: &dyn DataClient,
    ctx: &RequestContext,
    form: R::CreateForm,
) -> Result<MutationOutcome<R::Record>, ActionError> {
    let on_error = failed::<R>(Action::Create);
    if !R::can_create(ctx) {
        return Err(on_error(AppError::Forbidden));
    }
    if let Err(e) = form.validate() {
        return Err(on_error(e.into()));
    }
    let row = match R::insert_row(form, ctx) {
        Ok(row) => row,
        Err(e) => return Err(on_error(e)),
    };

    if let Err(e) = client.insert(R::COLLECTION, row).await {
        return Err(on_error(e.into()));
    }
    tracing::info!(user_id = %ctx.user_id, "{} created", R::LABEL);
    outcome::<R>(client, Action::Create).await
}

pub async fn update<R: Resource>(
    client: &dyn DataClient,
    ctx: &RequestContext,
    id: Uuid,
    form: R::UpdateForm,
) -> Result<MutationOutcome<R::Record>, ActionError> {
    let on_error = failed::<R>(Action::Update);
    let result = async {
        form.validate()?;
        let row = R::update_row(form)?;
        authorize::<R>(client, ctx, id).await?;
        client
            .update(R::COLLECTION, id, row)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok::<(), AppError>(())
    }
    .await;

    result.map_err(on_error)?;
    tracing::info!(user_id = %ctx.user_id, %id, "{} updated", R::LABEL);
    outcome::<R>(client, Action::Update).await
}

/// delete
///
/// Removes one record, but only once the caller has confirmed. Permission is
/// checked first; an unconfirmed request from a permitted caller is refused with
/// `ConfirmationRequired` and touches nothing.
pub async fn delete<R: Resource>(
    client: &dyn DataClient,
    ctx: &RequestContext,
    id: Uuid,
    confirmed: bool,
) -> Result<MutationOutcome<R::Record>, ActionError> {
    let on_error = failed::<R>(Action::Delete);
    let result = async {
        authorize::<R>(client, ctx, id).await?;
        if !confirmed {
            return Err(AppError::ConfirmationRequired(format!(
                "Are you sure you want to delete this {}? Repeat the request with confirm=true.",
                R::LABEL
            )));
        }
        if !client.delete(R::COLLECTION, id).await? {
            return Err(AppError::NotFound);
        }
        Ok::<(), AppError>(())
    }
    .await;

    result.map_err(on_error)?;
    tracing::info!(user_id = %ctx.user_id, %id, "{} deleted", R::LABEL);
    outcome::<R>(client, Action::Delete).await
}

// --- Handlers ---

pub async fn list_handler<R: Resource>(
    ctx: RequestContext,
    State(data): State<DataState>,
) -> Result<Json<Vec<R::Record>>, ActionError> {
    Ok(Json(list::<R>(data.as_ref(), &ctx).await?))
}

pub async fn create_handler<R: Resource>(
    ctx: RequestContext,
    State(data): State<DataState>,
    Json(form): Json<R::CreateForm>,
) -> Result<(StatusCode, Json<MutationOutcome<R::Record>>), ActionError> {
    let outcome = create::<R>(data.as_ref(), &ctx, form).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn update_handler<R: Resource>(
    ctx: RequestContext,
    State(data): State<DataState>,
    Path(id): Path<Uuid>,
    Json(form): Json<R::UpdateForm>,
) -> Result<Json<MutationOutcome<R::Record>>, ActionError> {
    Ok(Json(update::<R>(data.as_ref(), &ctx, id, form).await?))
}

pub async fn delete_handler<R: Resource>(
    ctx: RequestContext,
    State(data): State<DataState>,
    Path(id): Path<Uuid>,
    QueryParams(params): QueryParams<DeleteParams>,
) -> Result<Json<MutationOutcome<R::Record>>, ActionError> {
    Ok(Json(
        delete::<R>(data.as_ref(), &ctx, id, params.confirm).await?,
    ))
}

/// resource_routes
///
/// `GET|POST {PATH}` and `PUT|DELETE {PATH}/{id}` for one resource.
pub fn resource_routes<R: Resource>() -> Router<AppState> {
    Router::new()
        .route(R::PATH, get(list_handler::<R>).post(create_handler::<R>))
        .route(
            &format!("{}/{{id}}", R::PATH),
            axum::routing::put(update_handler::<R>).delete(delete_handler::<R>),
        )
}
