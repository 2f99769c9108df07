use rocket::Route;

mod report;
mod survey;
mod user;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(survey::routes());
    routes.extend(report::routes());
    routes.extend(user::routes());
    routes
}
