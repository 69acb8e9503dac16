// src/templates.rs
use crate::models::user::{
    CurrentUser, ROLE_COORDINATOR, ROLE_HELPDESK_ADMIN, ROLE_SOCIAL_SERVICE, ROLE_STUDENT, ROLE_TECH,
};
use askama::Template;

// Struct para o template `login.html` (ficheiro em templates/)
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub error: Option<String>,
}

pub struct HomeLink {
    pub method: &'static str,
    pub path: &'static str,
    pub label: &'static str,
}

pub struct HomeSection {
    pub title: &'static str,
    pub links: Vec<HomeLink>,
}

/// Página inicial: uma secção por sub-aplicação acessível ao utilizador.
#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage {
    pub full_name: String,
    pub sections: Vec<HomeSection>,
}

fn link(method: &'static str, path: &'static str, label: &'static str) -> HomeLink {
    HomeLink { method, path, label }
}

impl HomePage {
    pub fn for_user(full_name: String, user: &CurrentUser) -> Self {
        let mut sections = Vec::new();

        if user.is_admin() {
            sections.push(HomeSection {
                title: "Administração",
                links: vec![
                    link("GET", "/api/admin/users", "Utilizadores"),
                    link("GET", "/api/admin/programs", "Programas"),
                    link("GET", "/api/admin/periods", "Períodos"),
                ],
            });
        }
        if user.has_any_role(&[ROLE_STUDENT]) {
            sections.push(HomeSection {
                title: "AgendaTec · Aluno",
                links: vec![
                    link("GET", "/api/agendatec/periods/active", "Período ativo"),
                    link("GET", "/api/agendatec/student/slots", "Horários livres"),
                    link("GET", "/api/agendatec/student/requests", "Os meus pedidos"),
                ],
            });
        }
        if user.has_any_role(&[ROLE_COORDINATOR]) {
            sections.push(HomeSection {
                title: "AgendaTec · Coordenação",
                links: vec![
                    link("GET", "/api/agendatec/coord/windows", "Janelas de atendimento"),
                    link("GET", "/api/agendatec/coord/requests", "Pedidos"),
                    link("GET", "/api/agendatec/coord/dashboard", "Resumo do dia"),
                ],
            });
        }
        if user.has_any_role(&[ROLE_SOCIAL_SERVICE]) {
            sections.push(HomeSection {
                title: "AgendaTec · Serviço social",
                links: vec![link("GET", "/api/agendatec/social/appointments", "Marcações do dia")],
            });
        }

        // Qualquer utilizador pode abrir tickets
        let mut helpdesk = vec![
            link("GET", "/api/help-desk/tickets", "Tickets"),
            link("POST", "/api/help-desk/tickets", "Novo ticket"),
        ];
        if user.has_any_role(&[ROLE_TECH, ROLE_HELPDESK_ADMIN]) {
            helpdesk.push(link("GET", "/api/help-desk/inventory/items", "Inventário"));
        }
        if user.has_any_role(&[ROLE_HELPDESK_ADMIN]) {
            helpdesk.push(link("GET", "/api/help-desk/stats", "Estatísticas"));
        }
        sections.push(HomeSection {
            title: "Helpdesk",
            links: helpdesk,
        });

        HomePage { full_name, sections }
    }
}
