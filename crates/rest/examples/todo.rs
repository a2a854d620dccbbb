//! A TodoMVC API with its swagger UI at http://127.0.0.1:8080/
//!
//! curl -v http://127.0.0.1:8080/todos/
//! curl -v -H 'Content-Type: application/json' -d '{"task":"build an API"}' http://127.0.0.1:8080/todos/
//! curl -v -H 'X-Fields: {task}' http://127.0.0.1:8080/todos/1

use http::StatusCode;
use micro_rest::extract::{Path, Payload};
use micro_rest::{Api, BoxError, Doc, Field, Marshalling, Model, Namespace, Reply, Resource, Server, abort, handler_fn};
use once_cell::sync::Lazy;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

static TODOS: Lazy<RwLock<BTreeMap<u64, Value>>> = Lazy::new(|| RwLock::new(BTreeMap::new()));

async fn list_todos() -> Value {
    Value::Array(TODOS.read().await.values().cloned().collect())
}

async fn create_todo(Payload(mut todo): Payload) -> (Value, StatusCode) {
    let mut todos = TODOS.write().await;
    let id = todos.keys().next_back().map_or(1, |last| last + 1);
    todo["id"] = json!(id);
    todos.insert(id, todo.clone());
    (todo, StatusCode::CREATED)
}

async fn get_todo(Path(id): Path<u64>) -> Result<Value, BoxError> {
    match TODOS.read().await.get(&id) {
        Some(todo) => Ok(todo.clone()),
        None => Err(abort(StatusCode::NOT_FOUND, format!("Todo {id} doesn't exist")).into()),
    }
}

async fn update_todo(Path(id): Path<u64>, Payload(mut todo): Payload) -> Result<Value, BoxError> {
    let mut todos = TODOS.write().await;
    let Some(existing) = todos.get_mut(&id) else {
        return Err(abort(StatusCode::NOT_FOUND, format!("Todo {id} doesn't exist")).into());
    };
    todo["id"] = json!(id);
    *existing = todo.clone();
    Ok(todo)
}

async fn delete_todo(Path(id): Path<u64>) -> Result<Reply, BoxError> {
    match TODOS.write().await.remove(&id) {
        Some(_) => Ok(Reply::empty(StatusCode::NO_CONTENT)),
        None => Err(abort(StatusCode::NOT_FOUND, format!("Todo {id} doesn't exist")).into()),
    }
}

#[tokio::main]
async fn main() {
    let todo = Model::builder("Todo")
        .field("id", Field::integer().readonly().description("The task unique identifier"))
        .field("task", Field::string().required().description("The task details"))
        .build();

    let todos = Namespace::new("todos")
        .description("TODO operations")
        .model(&todo)
        .route(
            "/",
            Resource::builder("TodoList")
                .get_with(handler_fn(list_todos), Doc::new().summary("List all tasks").marshal_list_with(&todo))
                .post_with(
                    handler_fn(create_todo),
                    Doc::new()
                        .summary("Create a new task")
                        .expect(&todo)
                        .validate(true)
                        .marshal(Marshalling::new(&todo).code(StatusCode::CREATED)),
                )
                .build(),
        )
        .route(
            "/<int:id>",
            Resource::builder("Todo")
                .doc(Doc::new().param("id", "The task identifier").response(404, "Todo not found"))
                .get_with(handler_fn(get_todo), Doc::new().summary("Fetch a given resource").marshal_with(&todo))
                .put_with(
                    handler_fn(update_todo),
                    Doc::new().summary("Update a task given its identifier").expect(&todo).marshal_with(&todo),
                )
                .delete_with(handler_fn(delete_todo), Doc::new().summary("Delete a task given its identifier").response(204, "Todo deleted"))
                .build(),
        );

    let api = Api::new()
        .title("TodoMVC API")
        .version("1.0")
        .description("A simple TodoMVC API")
        .catch_all_404s()
        .add_namespace(todos);

    Server::builder().address("127.0.0.1:8080").plugin(api).build().unwrap().start().await;
}
